//! Consensus and policy constants shared across the workspace.

/// Locktime values at or above this are interpreted as unix timestamps by the
/// ledger; the lock template only supports block-height locking, so contract
/// fields must stay strictly below it.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number a redeeming input must carry. `0xFFFFFFFF` would disable
/// the transaction-level locktime check entirely.
pub const REDEEM_INPUT_SEQUENCE: u32 = 0xFFFF_FFFE;

/// Sighash flag: commit to no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sighash flag: commit only to the signer's own input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Fork id flag required on this ledger family for all post-fork signatures.
pub const SIGHASH_FORKID: u32 = 0x40;

/// The sighash type every redemption signature uses.
pub const REDEEM_SIGHASH_TYPE: u32 = SIGHASH_NONE | SIGHASH_ANYONECANPAY | SIGHASH_FORKID;

/// Serialized locking scripts at or below this many bytes are never treated
/// as contract candidates. Cheap filter that rejects plain pay-to-address
/// outputs before any decode work happens.
pub const MIN_CONTRACT_SCRIPT_LEN: usize = 150;

/// Smallest amount worth locking; below this the composition path refuses to
/// build a deployment output.
pub const MIN_LOCK_SATOSHIS: u64 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redeem_sighash_type_value() {
        assert_eq!(REDEEM_SIGHASH_TYPE, 0xC2);
    }
}
