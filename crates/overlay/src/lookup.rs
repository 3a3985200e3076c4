//! Outward query surface over the registry.

use hodlock_primitives::{buf::Hash160Buf, outref::OutputRef};
use hodlock_storage::{LockRegistry, RegistryError};
use serde::{Deserialize, Serialize};

/// The queries the lookup surface answers, one concrete variant per shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupQuery {
    /// Every outstanding lock.
    FindAll,
    /// Locks funded by one transaction, optionally a single output.
    ByTxid {
        #[serde(with = "hex::serde")]
        txid: [u8; 32],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vout: Option<u32>,
    },
    /// Locks owned by one address hash.
    ByAddress { owner: Hash160Buf },
}

/// One answer row: where the lock lives and the proof bundle that funds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    pub outpoint: OutputRef,
    #[serde(with = "hex::serde")]
    pub funding_proof: Vec<u8>,
}

/// Resolves lookup queries against the registry.
#[derive(Debug, Clone)]
pub struct LookupService {
    registry: LockRegistry,
}

impl LookupService {
    pub fn new(registry: LockRegistry) -> Self {
        Self { registry }
    }

    pub fn lookup(&self, query: &LookupQuery) -> Result<Vec<LockRecord>, RegistryError> {
        let entries = match query {
            LookupQuery::FindAll => self.registry.find_all()?,
            LookupQuery::ByTxid { txid, vout } => self.registry.find_by_txid(txid, *vout)?,
            LookupQuery::ByAddress { owner } => self.registry.find_by_owner(owner)?,
        };
        Ok(entries
            .into_iter()
            .map(|e| LockRecord {
                outpoint: *e.outpoint(),
                funding_proof: e.funding_proof().to_vec(),
            })
            .collect())
    }
}
