use curtail_core::StoreError;
use thiserror::Error;

/// Errors surfaced to the transport adapters.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("original url must not be empty")]
    EmptyUrl,
    #[error("invalid short code: {0}")]
    InvalidCode(String),
    #[error("deletion pipeline is stopped")]
    PipelineStopped,
    #[error(transparent)]
    Storage(#[from] StoreError),
}
