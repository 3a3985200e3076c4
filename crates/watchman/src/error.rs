use hodlock_beef::BundleError;
use hodlock_contract::sighash::SighashError;
use hodlock_primitives::outref::OutputRef;
use hodlock_storage::RegistryError;
use thiserror::Error;

use crate::traits::{ChainSourceError, CustodianError, SubmitError};

/// Failures inside the watchman. All of them are contained per entry or per
/// cycle and retried on the next pass; [`WatchmanError::is_transient`]
/// separates "the network hiccuped" from "this entry is misconfigured and
/// will keep failing until someone looks at it", which decides the log
/// level.
#[derive(Debug, Error)]
pub enum WatchmanError {
    #[error(transparent)]
    Chain(#[from] ChainSourceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Custodian(#[from] CustodianError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// The stored funding proof no longer parses.
    #[error("funding proof unparseable: {0}")]
    Proof(#[from] BundleError),

    /// The funding transaction does not carry the output the entry claims.
    #[error("funding proof for {outpoint} does not match the registry entry")]
    ProofMismatch { outpoint: OutputRef },

    #[error(transparent)]
    Sighash(#[from] SighashError),

    /// The custodian's derived key does not hash to the contract owner.
    /// Detected before assembly; nothing is broadcast.
    #[error("derived public key does not match owner hash for {outpoint}")]
    AddressMismatch { outpoint: OutputRef },

    /// The signature came back structurally unusable.
    #[error("custodian signature unusable for {outpoint}: {reason}")]
    SignatureRejected { outpoint: OutputRef, reason: String },

    #[error("redemption of {outpoint} timed out")]
    Timeout { outpoint: OutputRef },
}

impl WatchmanError {
    /// True when retrying later can plausibly succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            WatchmanError::Chain(_)
            | WatchmanError::Registry(_)
            | WatchmanError::Timeout { .. } => true,
            WatchmanError::Custodian(e) => matches!(e, CustodianError::Unreachable(_)),
            WatchmanError::Submit(e) => matches!(e, SubmitError::Unreachable(_)),
            WatchmanError::Proof(_)
            | WatchmanError::ProofMismatch { .. }
            | WatchmanError::Sighash(_)
            | WatchmanError::AddressMismatch { .. }
            | WatchmanError::SignatureRejected { .. } => false,
        }
    }
}
