use borsh::{BorshDeserialize, BorshSerialize};
use hodlock_primitives::{buf::Hash160Buf, constants::LOCKTIME_THRESHOLD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections when constructing a contract from raw field values.
///
/// These run both on the originator side when composing a lock and on every
/// decode of untrusted script bytes; bytes from an adversarial transaction
/// are never assumed to have been produced by a well-behaved encoder.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The locktime field doubles as a unix timestamp at or above the
    /// threshold, which would let a lock masquerade as height-based while
    /// actually being a timestamp far in the past.
    #[error("lock height {0} is in the timestamp locktime range, must use block height")]
    TimestampLocktimeNotAllowed(u32),

    /// Owner hash missing or not 20 bytes.
    #[error("owner hash must be 20 bytes, got {0}")]
    BadOwnerHash(usize),
}

/// Immutable parsed instance of the time-lock contract.
///
/// Produced by [`crate::script::decode`] or composed directly before
/// deployment; only referenced after construction, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct LockContract {
    owner_hash: Hash160Buf,
    lock_until_height: u32,
    payload: Vec<u8>,
}

impl LockContract {
    /// Builds a contract, enforcing the height-locktime bound.
    pub fn new(
        owner_hash: Hash160Buf,
        lock_until_height: u32,
        payload: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        if lock_until_height >= LOCKTIME_THRESHOLD {
            return Err(ValidationError::TimestampLocktimeNotAllowed(
                lock_until_height,
            ));
        }
        Ok(Self {
            owner_hash,
            lock_until_height,
            payload,
        })
    }

    /// Like [`LockContract::new`] but from an unchecked owner-hash slice, the
    /// entry point for wallet-provided field values.
    pub fn from_raw_fields(
        owner_hash: &[u8],
        lock_until_height: u32,
        payload: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        let owner = Hash160Buf::try_from_slice(owner_hash)
            .map_err(|_| ValidationError::BadOwnerHash(owner_hash.len()))?;
        Self::new(owner, lock_until_height, payload)
    }

    pub fn owner_hash(&self) -> &Hash160Buf {
        &self.owner_hash
    }

    pub fn lock_until_height(&self) -> u32 {
        self.lock_until_height
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether the lock window has passed at the given chain height.
    pub fn is_matured_at(&self, height: u32) -> bool {
        height >= self.lock_until_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Hash160Buf {
        Hash160Buf::new([0x11; 20])
    }

    #[test]
    fn accepts_height_below_threshold() {
        let c = LockContract::new(owner(), 499_999_999, vec![]).unwrap();
        assert_eq!(c.lock_until_height(), 499_999_999);
    }

    #[test]
    fn rejects_timestamp_range() {
        assert_eq!(
            LockContract::new(owner(), 500_000_000, vec![]),
            Err(ValidationError::TimestampLocktimeNotAllowed(500_000_000))
        );
        assert!(LockContract::new(owner(), u32::MAX, vec![]).is_err());
    }

    #[test]
    fn rejects_short_owner_hash() {
        assert_eq!(
            LockContract::from_raw_fields(&[1, 2, 3], 1000, vec![]),
            Err(ValidationError::BadOwnerHash(3))
        );
    }

    #[test]
    fn maturity_is_inclusive() {
        let c = LockContract::new(owner(), 150_000, b"msg".to_vec()).unwrap();
        assert!(!c.is_matured_at(149_999));
        assert!(c.is_matured_at(150_000));
        assert!(c.is_matured_at(150_001));
    }
}
