//! Interfaces to the external collaborators the watchman drives. The
//! implementations live outside this crate; mocks are generated for tests.

use async_trait::async_trait;
use hodlock_primitives::keys::KeyRef;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainSourceError {
    #[error("chain source unreachable: {0}")]
    Unreachable(String),

    #[error("chain source returned a malformed response: {0}")]
    BadResponse(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustodianError {
    #[error("custodian unreachable: {0}")]
    Unreachable(String),

    /// The custodian refused the request (unknown key, policy denial).
    #[error("custodian rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("submission endpoint unreachable: {0}")]
    Unreachable(String),

    /// The ledger or overlay refused the transaction, with its reason.
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Where the current chain height comes from.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ChainSource: Send + Sync + 'static {
    async fn current_height(&self) -> Result<u32, ChainSourceError>;
}

/// The key custodian. Private material never crosses this boundary: we hand
/// over a digest and a key binding, a signature comes back.
///
/// The custodian signs over the SHA-256 of the data it is given.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait KeyCustodian: Send + Sync + 'static {
    /// DER-encoded public key bytes (compressed or uncompressed SEC form).
    async fn public_key(&self, key_ref: &KeyRef) -> Result<Vec<u8>, CustodianError>;

    /// DER-encoded ECDSA signature over SHA-256(`data`).
    async fn sign(&self, key_ref: &KeyRef, data: &[u8]) -> Result<Vec<u8>, CustodianError>;
}

/// Accepts a fully-signed transaction for broadcast under a topic.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TxSubmitter: Send + Sync + 'static {
    async fn submit(&self, tx_bytes: Vec<u8>, topic: &str) -> Result<(), SubmitError>;
}
