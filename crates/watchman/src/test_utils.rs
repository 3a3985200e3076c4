//! Shared fixtures for watchman tests.

use bitcoin::{
    absolute::LockTime,
    consensus::serialize,
    hashes::{hash160, Hash},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use hodlock_contract::{script, LockContract};
use hodlock_db::LockEntry;
use hodlock_primitives::{buf::Hash160Buf, keys::KeyRef, outref::OutputRef};

/// The "wallet key" every fixture lock is owned by.
pub(crate) const FIXTURE_PUBKEY: &[u8; 33] = &[0x03; 33];

/// A matured-or-not lock entry backed by a consistent funding proof: the
/// funding transaction carries a throwaway output at vout 0 and the lock
/// output at vout 1.
pub(crate) fn lock_entry_with_key(txid_seed: u8, height: u32) -> (LockEntry, KeyRef) {
    let owner = Hash160Buf::new(hash160::Hash::hash(FIXTURE_PUBKEY).to_byte_array());
    let contract = LockContract::new(owner, height, b"fixture lock".to_vec()).unwrap();
    let lock_script = script::encode(&contract);

    let funding = Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array([txid_seed; 32]), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![
            TxOut {
                value: Amount::from_sat(546),
                script_pubkey: ScriptBuf::from_bytes(vec![0x51]),
            },
            TxOut {
                value: Amount::from_sat(2000),
                script_pubkey: lock_script.clone(),
            },
        ],
    };

    let mut bundle = vec![0x01, 0x00, 0xBE, 0xEF];
    bundle.push(0x00); // no proofs
    bundle.push(0x01); // one tx
    bundle.extend_from_slice(&serialize(&funding));
    bundle.push(0x00);

    let outpoint = OutputRef::new(funding.compute_txid(), 1);
    let key_ref = KeyRef::for_key("fixture");
    let mut entry = LockEntry::new(
        outpoint,
        2000,
        lock_script.into_bytes(),
        contract,
        bundle,
        1_700_000_000,
    );
    entry.set_key_ref(key_ref.clone());
    (entry, key_ref)
}
