//! Service layer of the Curtail URL shortener.
//!
//! [`LinkService`] composes a storage backend with code generation and
//! the asynchronous deletion pipeline into the operations that the
//! transport adapters (HTTP/gRPC handlers, auth middleware) call.
//! Those adapters live outside this workspace; their boundary is the
//! service API in this crate.

pub mod config;
pub mod deleter;
pub mod error;
pub mod service;

pub use config::{Config, ConfigError, StorageBackendArg};
pub use deleter::{Deleter, DeleterSettings};
pub use error::ServiceError;
pub use service::{BatchRequestItem, BatchResultItem, CreatedLink, LinkService, OwnedLink, Stats};
