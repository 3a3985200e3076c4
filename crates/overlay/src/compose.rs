//! Originator-side lock composition: turn wallet-provided key material and a
//! lock duration into the deployable locking script plus the key binding the
//! watchman will need at redemption time.

use bitcoin::{
    hashes::{hash160, Hash},
    ScriptBuf,
};
use hodlock_contract::{script, LockContract, ValidationError};
use hodlock_primitives::{constants::MIN_LOCK_SATOSHIS, keys::KeyRef};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("cannot lock {0} satoshis, minimum is {MIN_LOCK_SATOSHIS}")]
    AmountTooSmall(u64),

    /// Every lock carries a public reason for locking.
    #[error("lock message must not be empty")]
    EmptyMessage,

    #[error("public key bytes are not 33 or 65 bytes")]
    BadPublicKey,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Everything needed to deploy one lock output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedLock {
    pub contract: LockContract,
    pub locking_script: ScriptBuf,
    pub satoshis: u64,
    pub key_ref: KeyRef,
}

/// Builds the lock for `satoshis` until `lock_until_height`, owned by the
/// given wallet public key, with `message` as the public payload.
pub fn compose_lock(
    owner_pubkey: &[u8],
    lock_until_height: u32,
    satoshis: u64,
    message: &[u8],
    key_ref: KeyRef,
) -> Result<ComposedLock, ComposeError> {
    if satoshis < MIN_LOCK_SATOSHIS {
        return Err(ComposeError::AmountTooSmall(satoshis));
    }
    if message.is_empty() {
        return Err(ComposeError::EmptyMessage);
    }
    if owner_pubkey.len() != 33 && owner_pubkey.len() != 65 {
        return Err(ComposeError::BadPublicKey);
    }

    let owner_hash = hash160::Hash::hash(owner_pubkey).to_byte_array();
    let contract = LockContract::from_raw_fields(&owner_hash, lock_until_height, message.to_vec())?;
    let locking_script = script::encode(&contract);

    Ok(ComposedLock {
        contract,
        locking_script,
        satoshis,
        key_ref,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pubkey() -> Vec<u8> {
        let mut pk = vec![0x02];
        pk.extend_from_slice(&[0x7C; 32]);
        pk
    }

    #[test]
    fn composed_script_decodes_back() {
        let composed = compose_lock(&pubkey(), 160_000, 5000, b"diamond hands", KeyRef::for_key("1"))
            .unwrap();
        let decoded = script::decode(&composed.locking_script).unwrap();
        assert_eq!(decoded, composed.contract);
        assert_eq!(decoded.payload(), b"diamond hands");
    }

    #[test]
    fn enforces_minimum_amount() {
        assert_eq!(
            compose_lock(&pubkey(), 160_000, 4, b"m", KeyRef::for_key("1")),
            Err(ComposeError::AmountTooSmall(4))
        );
    }

    #[test]
    fn requires_a_message() {
        assert_eq!(
            compose_lock(&pubkey(), 160_000, 5000, b"", KeyRef::for_key("1")),
            Err(ComposeError::EmptyMessage)
        );
    }

    #[test]
    fn rejects_bad_pubkey_and_timestamp_height() {
        assert_eq!(
            compose_lock(&[0x02; 10], 160_000, 5000, b"m", KeyRef::for_key("1")),
            Err(ComposeError::BadPublicKey)
        );
        assert!(matches!(
            compose_lock(&pubkey(), 500_000_000, 5000, b"m", KeyRef::for_key("1")),
            Err(ComposeError::Invalid(
                ValidationError::TimestampLocktimeNotAllowed(_)
            ))
        ));
    }
}
