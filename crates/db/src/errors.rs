use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The backing store failed at the I/O level.
    #[error("store backend: {0}")]
    Backend(String),

    /// A stored value failed to (de)serialize; indicates corruption or a
    /// schema change without migration.
    #[error("entry codec: {0}")]
    Codec(String),
}

pub type DbResult<T> = Result<T, DbError>;
