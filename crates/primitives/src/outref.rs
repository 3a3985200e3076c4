use std::{fmt, str::FromStr};

use bitcoin::{hashes::Hash, Txid};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// Canonical reference to a ledger output, the registry's primary key.
///
/// The txid is held in internal (consensus) byte order; [`fmt::Display`]
/// renders it in the reversed RPC order everyone pastes into explorers.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct OutputRef {
    txid: [u8; 32],
    vout: u32,
}

impl OutputRef {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self {
            txid: txid.to_byte_array(),
            vout,
        }
    }

    pub fn from_raw(txid: [u8; 32], vout: u32) -> Self {
        Self { txid, vout }
    }

    pub fn txid(&self) -> Txid {
        Txid::from_byte_array(self.txid)
    }

    pub fn txid_bytes(&self) -> &[u8; 32] {
        &self.txid
    }

    pub fn vout(&self) -> u32 {
        self.vout
    }

    /// Fixed-width key for ordered stores: txid bytes then big-endian vout,
    /// so all outputs of one transaction are adjacent.
    pub fn index_key(&self) -> [u8; 36] {
        let mut key = [0u8; 36];
        key[..32].copy_from_slice(&self.txid);
        key[32..].copy_from_slice(&self.vout.to_be_bytes());
        key
    }
}

impl From<bitcoin::OutPoint> for OutputRef {
    fn from(op: bitcoin::OutPoint) -> Self {
        Self::new(op.txid, op.vout)
    }
}

impl From<OutputRef> for bitcoin::OutPoint {
    fn from(r: OutputRef) -> Self {
        bitcoin::OutPoint::new(r.txid(), r.vout)
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid(), self.vout)
    }
}

impl fmt::Debug for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputRef({})", self)
    }
}

impl FromStr for OutputRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid_part, vout_part) = s.split_once(':').ok_or(ParseError::BadOutputRef)?;
        let txid = Txid::from_str(txid_part).map_err(|_| ParseError::BadHex)?;
        let vout = vout_part.parse().map_err(|_| ParseError::BadOutputRef)?;
        Ok(Self::new(txid, vout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_roundtrip() {
        let r = OutputRef::from_raw([3u8; 32], 7);
        let parsed: OutputRef = r.to_string().parse().unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn index_key_orders_vouts_within_txid() {
        let a = OutputRef::from_raw([1u8; 32], 1);
        let b = OutputRef::from_raw([1u8; 32], 256);
        assert!(a.index_key() < b.index_key());
    }
}
