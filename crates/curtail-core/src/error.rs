use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced by the storage backends.
///
/// A missing record is not an error: lookups return `Ok(None)`.
/// Content conflicts are not errors either, they are carried by
/// [`SaveOutcome::Existing`](crate::link::SaveOutcome).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("invalid short code: {0}")]
    InvalidCode(String),
    #[error("{0} is not supported by this storage backend")]
    Unsupported(&'static str),
    #[error("no unused short code found after {attempts} attempts")]
    CollisionExhausted { attempts: u32 },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
}

impl StoreError {
    /// Whether this error marks a capability gap of the active backend
    /// rather than a real failure. Callers may degrade gracefully.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StoreError::Unsupported(_))
    }
}
