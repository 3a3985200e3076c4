use borsh::{BorshDeserialize, BorshSerialize};
use hodlock_contract::LockContract;
use hodlock_primitives::{buf::Hash160Buf, keys::KeyRef, outref::OutputRef};

/// Persisted projection of an admitted lock output.
///
/// Created on admission notification and deleted on spend/delete
/// notification; the lock parameters never change for the life of the
/// output, so entries are never updated in place. The only mutable piece is
/// the optional key binding, which the originator records separately after
/// deployment.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LockEntry {
    outpoint: OutputRef,
    satoshis: u64,
    locking_script: Vec<u8>,
    contract: LockContract,
    key_ref: Option<KeyRef>,
    funding_proof: Vec<u8>,
    inserted_at: u64,
}

impl LockEntry {
    pub fn new(
        outpoint: OutputRef,
        satoshis: u64,
        locking_script: Vec<u8>,
        contract: LockContract,
        funding_proof: Vec<u8>,
        inserted_at: u64,
    ) -> Self {
        Self {
            outpoint,
            satoshis,
            locking_script,
            contract,
            key_ref: None,
            funding_proof,
            inserted_at,
        }
    }

    pub fn outpoint(&self) -> &OutputRef {
        &self.outpoint
    }

    pub fn satoshis(&self) -> u64 {
        self.satoshis
    }

    pub fn locking_script(&self) -> &[u8] {
        &self.locking_script
    }

    pub fn contract(&self) -> &LockContract {
        &self.contract
    }

    pub fn owner_hash(&self) -> &Hash160Buf {
        self.contract.owner_hash()
    }

    pub fn key_ref(&self) -> Option<&KeyRef> {
        self.key_ref.as_ref()
    }

    pub fn set_key_ref(&mut self, key_ref: KeyRef) {
        self.key_ref = Some(key_ref);
    }

    pub fn funding_proof(&self) -> &[u8] {
        &self.funding_proof
    }

    pub fn inserted_at(&self) -> u64 {
        self.inserted_at
    }
}
