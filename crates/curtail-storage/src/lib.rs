//! Storage backends for the Curtail URL shortener.
//!
//! Three interchangeable implementations of the [`UrlStore`] contract:
//! a volatile in-memory map, an in-memory map backed by an append-only
//! record log, and a Postgres table used as source of truth. The
//! backend is chosen once at construction time via [`AnyStore`].
//!
//! [`UrlStore`]: curtail_core::UrlStore

pub mod backend;
pub mod file;
pub mod memory;
pub mod postgres;

pub use backend::AnyStore;
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
