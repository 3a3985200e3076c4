//! Fork-id signature-hash preimage construction.
//!
//! The post-fork ledger family hashes a fixed-layout preimage (version,
//! prevout/sequence/outputs commitments, the spent output's script and value,
//! locktime, sighash type) rather than the legacy substituted-script form.
//! The redemption path only ever signs ANYONECANPAY|NONE, but the
//! construction supports the full flag matrix so it can be checked against
//! the standard vectors.

use bitcoin::{
    consensus::{encode::VarInt, serialize},
    hashes::{sha256d, Hash},
    Script, Transaction,
};
use hodlock_primitives::constants::{SIGHASH_ANYONECANPAY, SIGHASH_FORKID, SIGHASH_NONE};
use sha2::{Digest, Sha256};
use thiserror::Error;

const SIGHASH_SINGLE: u32 = 0x03;
const BASE_TYPE_MASK: u32 = 0x1f;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SighashError {
    #[error("input index {index} out of range, transaction has {inputs} inputs")]
    InputOutOfRange { index: usize, inputs: usize },

    #[error("sighash type {0:#x} is missing the fork id flag")]
    MissingForkId(u32),
}

/// Builds the preimage for signing `input_index` of `tx`, which spends an
/// output of `value` satoshis locked by `script_code`.
pub fn fork_id_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    value: u64,
    sighash_type: u32,
) -> Result<Vec<u8>, SighashError> {
    if sighash_type & SIGHASH_FORKID == 0 {
        return Err(SighashError::MissingForkId(sighash_type));
    }
    let input = tx
        .input
        .get(input_index)
        .ok_or(SighashError::InputOutOfRange {
            index: input_index,
            inputs: tx.input.len(),
        })?;

    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;
    let base_type = sighash_type & BASE_TYPE_MASK;

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        let mut buf = Vec::with_capacity(36 * tx.input.len());
        for txin in &tx.input {
            buf.extend_from_slice(&serialize(&txin.previous_output));
        }
        sha256d::Hash::hash(&buf).to_byte_array()
    };

    let hash_sequence = if anyone_can_pay || base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE
    {
        [0u8; 32]
    } else {
        let mut buf = Vec::with_capacity(4 * tx.input.len());
        for txin in &tx.input {
            buf.extend_from_slice(&txin.sequence.0.to_le_bytes());
        }
        sha256d::Hash::hash(&buf).to_byte_array()
    };

    let hash_outputs = match base_type {
        SIGHASH_NONE => [0u8; 32],
        SIGHASH_SINGLE => {
            if let Some(out) = tx.output.get(input_index) {
                sha256d::Hash::hash(&serialize(out)).to_byte_array()
            } else {
                [0u8; 32]
            }
        }
        _ => {
            let mut buf = Vec::new();
            for out in &tx.output {
                buf.extend_from_slice(&serialize(out));
            }
            sha256d::Hash::hash(&buf).to_byte_array()
        }
    };

    let script_bytes = script_code.as_bytes();
    let mut preimage = Vec::with_capacity(156 + script_bytes.len());
    preimage.extend_from_slice(&tx.version.0.to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    preimage.extend_from_slice(&serialize(&input.previous_output));
    preimage.extend_from_slice(&serialize(&VarInt(script_bytes.len() as u64)));
    preimage.extend_from_slice(script_bytes);
    preimage.extend_from_slice(&value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.0.to_le_bytes());
    preimage.extend_from_slice(&hash_outputs);
    preimage.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    Ok(preimage)
}

/// Single SHA-256 of the preimage. The key custodian signs over the SHA-256
/// of whatever it is handed, so the digest that ends up under the signature
/// is the consensus double hash.
pub fn redemption_digest(preimage: &[u8]) -> [u8; 32] {
    Sha256::digest(preimage).into()
}
