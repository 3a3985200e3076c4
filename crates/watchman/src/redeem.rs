//! The redemption pipeline.
//!
//! One matured registry entry goes through a short sequence of stages, each
//! returning a `Result` so failures stay attributable: rebuild and
//! cross-check the funding transaction from the stored proof, build the
//! spending skeleton, compute the sighash digest, obtain the custodian
//! signature, assemble the unlocking input, submit. Nothing is persisted
//! between stages; a failed attempt is rebuilt from scratch on the next
//! cycle.

use bitcoin::{
    absolute::LockTime,
    consensus::serialize,
    hashes::{hash160, Hash},
    script::{Builder, PushBytesBuf},
    transaction::Version,
    Script, ScriptBuf, Sequence, Transaction, TxIn, Witness,
};
use hodlock_beef::BeefBundle;
use hodlock_contract::sighash::{fork_id_preimage, redemption_digest};
use hodlock_db::LockEntry;
use hodlock_primitives::{
    constants::{REDEEM_INPUT_SEQUENCE, REDEEM_SIGHASH_TYPE},
    keys::KeyRef,
};
use tracing::*;

use crate::{
    error::WatchmanError,
    traits::{KeyCustodian, TxSubmitter},
};

/// Verifies the stored funding proof still describes the output we believe
/// we are spending: same script, same value, output present at the recorded
/// index.
pub fn verify_funding(entry: &LockEntry) -> Result<(), WatchmanError> {
    let bundle = BeefBundle::parse(entry.funding_proof())?;
    let outpoint = *entry.outpoint();
    let tx = bundle
        .find_tx(outpoint.txid())
        .ok_or(WatchmanError::ProofMismatch { outpoint })?;
    let output = tx
        .output
        .get(outpoint.vout() as usize)
        .ok_or(WatchmanError::ProofMismatch { outpoint })?;

    if output.script_pubkey.as_bytes() != entry.locking_script()
        || output.value.to_sat() != entry.satoshis()
    {
        return Err(WatchmanError::ProofMismatch { outpoint });
    }
    Ok(())
}

/// Spending-transaction skeleton: one input over the locked output with the
/// locktime-honoring sequence, locktime pinned to the contract height, and
/// no outputs. The NONE sighash leaves output placement to the submitter.
pub fn build_skeleton(entry: &LockEntry) -> Transaction {
    Transaction {
        version: Version::ONE,
        lock_time: LockTime::from_consensus(entry.contract().lock_until_height()),
        input: vec![TxIn {
            previous_output: (*entry.outpoint()).into(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence(REDEEM_INPUT_SEQUENCE),
            witness: Witness::new(),
        }],
        output: vec![],
    }
}

/// Digest the custodian signs: single SHA-256 of the ANYONECANPAY|NONE
/// fork-id preimage over the skeleton's only input.
pub fn compute_digest(skeleton: &Transaction, entry: &LockEntry) -> Result<[u8; 32], WatchmanError> {
    let script_code = Script::from_bytes(entry.locking_script());
    let preimage = fork_id_preimage(
        skeleton,
        0,
        script_code,
        entry.satoshis(),
        REDEEM_SIGHASH_TYPE,
    )?;
    Ok(redemption_digest(&preimage))
}

/// Checks that the custodian's derived key actually owns this lock, before
/// anything is signed or broadcast.
pub fn check_owner(entry: &LockEntry, pubkey: &[u8]) -> Result<(), WatchmanError> {
    let derived = hash160::Hash::hash(pubkey).to_byte_array();
    if &derived != entry.owner_hash().as_bytes() {
        return Err(WatchmanError::AddressMismatch {
            outpoint: *entry.outpoint(),
        });
    }
    Ok(())
}

/// `<signature ++ sighash byte> <public key>`.
pub fn assemble_unlock(
    entry: &LockEntry,
    signature_der: &[u8],
    pubkey: &[u8],
) -> Result<ScriptBuf, WatchmanError> {
    let outpoint = *entry.outpoint();
    let reject = |reason: &str| WatchmanError::SignatureRejected {
        outpoint,
        reason: reason.to_string(),
    };

    if signature_der.is_empty() || signature_der.len() > 72 {
        return Err(reject("implausible DER length"));
    }

    let mut sig_push = signature_der.to_vec();
    sig_push.push((REDEEM_SIGHASH_TYPE & 0xFF) as u8);
    let sig_push = PushBytesBuf::try_from(sig_push).map_err(|_| reject("signature too long"))?;
    let pk_push =
        PushBytesBuf::try_from(pubkey.to_vec()).map_err(|_| reject("public key too long"))?;

    Ok(Builder::new().push_slice(sig_push).push_slice(pk_push).into_script())
}

/// Working state for one redemption, built fresh each cycle and discarded on
/// success or failure; a failed attempt leaves nothing behind and is retried
/// from scratch.
#[derive(Debug)]
pub struct RedemptionAttempt<'a> {
    entry: &'a LockEntry,
    key_ref: &'a KeyRef,
    skeleton: Transaction,
    digest: [u8; 32],
    signature: Option<Vec<u8>>,
    pubkey: Option<Vec<u8>>,
}

impl<'a> RedemptionAttempt<'a> {
    /// Stage 1–3: funding cross-check, skeleton, digest. Pure; no
    /// collaborator calls yet.
    pub fn prepare(entry: &'a LockEntry, key_ref: &'a KeyRef) -> Result<Self, WatchmanError> {
        verify_funding(entry)?;
        let skeleton = build_skeleton(entry);
        let digest = compute_digest(&skeleton, entry)?;
        Ok(Self {
            entry,
            key_ref,
            skeleton,
            digest,
            signature: None,
            pubkey: None,
        })
    }

    /// Stage 4: fetch the bound key, fail fast on a derivation mismatch,
    /// obtain the signature.
    pub async fn sign_with<K: KeyCustodian>(&mut self, custodian: &K) -> Result<(), WatchmanError> {
        let pubkey = custodian.public_key(self.key_ref).await?;
        check_owner(self.entry, &pubkey)?;
        let signature = custodian.sign(self.key_ref, &self.digest).await?;
        self.pubkey = Some(pubkey);
        self.signature = Some(signature);
        Ok(())
    }

    /// Stage 5: the finished spending transaction.
    pub fn assemble(&self) -> Result<Transaction, WatchmanError> {
        let (signature, pubkey) = self
            .signature
            .as_deref()
            .zip(self.pubkey.as_deref())
            .ok_or_else(|| WatchmanError::SignatureRejected {
                outpoint: *self.entry.outpoint(),
                reason: "assemble before signing".to_string(),
            })?;
        let mut tx = self.skeleton.clone();
        tx.input[0].script_sig = assemble_unlock(self.entry, signature, pubkey)?;
        Ok(tx)
    }
}

/// Runs the whole pipeline for one entry and submits the result.
pub async fn run_redemption<K, S>(
    entry: &LockEntry,
    key_ref: &KeyRef,
    topic: &str,
    custodian: &K,
    submitter: &S,
) -> Result<(), WatchmanError>
where
    K: KeyCustodian,
    S: TxSubmitter,
{
    let mut attempt = RedemptionAttempt::prepare(entry, key_ref)?;
    attempt.sign_with(custodian).await?;
    let tx = attempt.assemble()?;

    debug!(outpoint = %entry.outpoint(), txid = %tx.compute_txid(), "submitting redemption");
    submitter.submit(serialize(&tx), topic).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use hodlock_primitives::constants::LOCKTIME_THRESHOLD;

    use super::*;
    use crate::test_utils::{lock_entry_with_key, FIXTURE_PUBKEY};
    use crate::traits::{CustodianError, MockKeyCustodian, MockTxSubmitter};

    #[test]
    fn verify_funding_accepts_the_fixture() {
        let (entry, _) = lock_entry_with_key(1, 100_000);
        verify_funding(&entry).unwrap();
    }

    #[test]
    fn verify_funding_rejects_value_drift() {
        let (entry, _) = lock_entry_with_key(1, 100_000);
        let tampered = LockEntry::new(
            *entry.outpoint(),
            entry.satoshis() + 1,
            entry.locking_script().to_vec(),
            entry.contract().clone(),
            entry.funding_proof().to_vec(),
            entry.inserted_at(),
        );
        assert!(matches!(
            verify_funding(&tampered),
            Err(WatchmanError::ProofMismatch { .. })
        ));
    }

    #[test]
    fn skeleton_honors_locktime_rules() {
        let (entry, _) = lock_entry_with_key(1, 123_456);
        let tx = build_skeleton(&entry);
        assert_eq!(tx.lock_time.to_consensus_u32(), 123_456);
        assert!(tx.lock_time.to_consensus_u32() < LOCKTIME_THRESHOLD);
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.input[0].sequence, Sequence(0xFFFF_FFFE));
        assert!(tx.output.is_empty());
        assert_eq!(
            bitcoin::OutPoint::from(*entry.outpoint()),
            tx.input[0].previous_output
        );
    }

    #[test]
    fn digest_is_stable() {
        let (entry, _) = lock_entry_with_key(1, 100_000);
        let tx = build_skeleton(&entry);
        assert_eq!(
            compute_digest(&tx, &entry).unwrap(),
            compute_digest(&tx, &entry).unwrap()
        );
    }

    #[test]
    fn owner_check_catches_foreign_keys() {
        let (entry, _) = lock_entry_with_key(1, 100_000);
        check_owner(&entry, FIXTURE_PUBKEY).unwrap();
        assert!(matches!(
            check_owner(&entry, &[0x02; 33]),
            Err(WatchmanError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn unlock_script_shape() {
        let (entry, _) = lock_entry_with_key(1, 100_000);
        let sig = vec![0x30; 70];
        let script = assemble_unlock(&entry, &sig, FIXTURE_PUBKEY).unwrap();
        let bytes = script.as_bytes();
        // 71-byte push (sig + hashtype), then 33-byte push
        assert_eq!(bytes[0], 71);
        assert_eq!(bytes[71], 0xC2);
        assert_eq!(bytes[72], 33);
        assert_eq!(bytes.len(), 1 + 71 + 1 + 33);

        assert!(matches!(
            assemble_unlock(&entry, &[], FIXTURE_PUBKEY),
            Err(WatchmanError::SignatureRejected { .. })
        ));
    }

    #[test]
    fn assemble_requires_a_signature() {
        let (entry, key_ref) = lock_entry_with_key(1, 100_000);
        let attempt = RedemptionAttempt::prepare(&entry, &key_ref).unwrap();
        assert!(matches!(
            attempt.assemble(),
            Err(WatchmanError::SignatureRejected { .. })
        ));
    }

    #[tokio::test]
    async fn full_pipeline_submits_once() {
        let (entry, key_ref) = lock_entry_with_key(1, 100_000);

        let mut custodian = MockKeyCustodian::new();
        custodian
            .expect_public_key()
            .returning(|_| Ok(FIXTURE_PUBKEY.to_vec()));
        custodian.expect_sign().returning(|_, _| Ok(vec![0x30; 70]));

        let mut submitter = MockTxSubmitter::new();
        submitter
            .expect_submit()
            .withf(|tx_bytes, topic| topic == "tm_hodlock" && !tx_bytes.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        run_redemption(&entry, &key_ref, "tm_hodlock", &custodian, &submitter)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn derivation_mismatch_never_reaches_submission() {
        let (entry, key_ref) = lock_entry_with_key(1, 100_000);

        let mut custodian = MockKeyCustodian::new();
        custodian
            .expect_public_key()
            .returning(|_| Ok(vec![0x02; 33]));
        custodian.expect_sign().never();

        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();

        let err = run_redemption(&entry, &key_ref, "tm_hodlock", &custodian, &submitter)
            .await
            .unwrap_err();
        assert!(matches!(err, WatchmanError::AddressMismatch { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn custodian_refusal_is_contained() {
        let (entry, key_ref) = lock_entry_with_key(1, 100_000);

        let mut custodian = MockKeyCustodian::new();
        custodian
            .expect_public_key()
            .returning(|_| Ok(FIXTURE_PUBKEY.to_vec()));
        custodian
            .expect_sign()
            .returning(|_, _| Err(CustodianError::Rejected("policy".into())));

        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();

        let err = run_redemption(&entry, &key_ref, "tm_hodlock", &custodian, &submitter)
            .await
            .unwrap_err();
        assert!(matches!(err, WatchmanError::Custodian(_)));
    }
}
