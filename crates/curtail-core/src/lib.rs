//! Core types and traits for the Curtail URL shortener.
//!
//! This crate provides the storage contract and the shared types
//! used by every backend and by the service layer.

pub mod error;
pub mod link;
pub mod store;

pub use error::{Result, StoreError};
pub use link::{BatchEntry, SaveOutcome, ShortCode, UserLink};
pub use store::UrlStore;
