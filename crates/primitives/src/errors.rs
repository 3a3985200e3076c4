use thiserror::Error;

/// Errors from parsing primitive values out of untrusted input.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("expected 20 hash bytes, got {0}")]
    BadHashLength(usize),

    #[error("expected 32 txid bytes, got {0}")]
    BadTxidLength(usize),

    #[error("invalid hex")]
    BadHex,

    #[error("malformed output reference")]
    BadOutputRef,
}
