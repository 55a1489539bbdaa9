use crate::{FileStore, InMemoryStore, PostgresStore};
use async_trait::async_trait;
use curtail_core::error::Result;
use curtail_core::link::{BatchEntry, SaveOutcome, ShortCode, UserLink};
use curtail_core::store::UrlStore;
use curtail_idgen::RandomGenerator;
use sqlx::PgPool;
use std::path::Path;

/// The storage backend selected at construction time.
///
/// The variant is decided once, when the process is configured; there
/// is no runtime capability sniffing. Operations a variant cannot
/// support surface as `StoreError::Unsupported` through the contract.
pub enum AnyStore {
    Memory(InMemoryStore<RandomGenerator>),
    File(FileStore<RandomGenerator>),
    Postgres(PostgresStore<RandomGenerator>),
}

impl AnyStore {
    /// A volatile in-memory backend.
    pub fn memory() -> Self {
        AnyStore::Memory(InMemoryStore::new(RandomGenerator::new()))
    }

    /// A file-log backed backend, replaying the log at `path`.
    pub async fn file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(AnyStore::File(
            FileStore::open(path, RandomGenerator::new()).await?,
        ))
    }

    /// A Postgres backend over a fresh pool, with the schema ensured.
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let store = PostgresStore::connect(database_url, RandomGenerator::new()).await?;
        store.ensure_schema().await?;
        Ok(AnyStore::Postgres(store))
    }

    /// A Postgres backend over an existing pool, with the schema ensured.
    pub async fn postgres_pool(pool: PgPool) -> Result<Self> {
        let store = PostgresStore::new(pool, RandomGenerator::new());
        store.ensure_schema().await?;
        Ok(AnyStore::Postgres(store))
    }
}

#[async_trait]
impl UrlStore for AnyStore {
    async fn save_url(&self, owner: &str, original: &str) -> Result<SaveOutcome> {
        match self {
            AnyStore::Memory(store) => store.save_url(owner, original).await,
            AnyStore::File(store) => store.save_url(owner, original).await,
            AnyStore::Postgres(store) => store.save_url(owner, original).await,
        }
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        match self {
            AnyStore::Memory(store) => store.get_url(code).await,
            AnyStore::File(store) => store.get_url(code).await,
            AnyStore::Postgres(store) => store.get_url(code).await,
        }
    }

    async fn batch_save(&self, owner: &str, entries: &[BatchEntry]) -> Result<()> {
        match self {
            AnyStore::Memory(store) => store.batch_save(owner, entries).await,
            AnyStore::File(store) => store.batch_save(owner, entries).await,
            AnyStore::Postgres(store) => store.batch_save(owner, entries).await,
        }
    }

    async fn user_urls(&self, owner: &str) -> Result<Vec<UserLink>> {
        match self {
            AnyStore::Memory(store) => store.user_urls(owner).await,
            AnyStore::File(store) => store.user_urls(owner).await,
            AnyStore::Postgres(store) => store.user_urls(owner).await,
        }
    }

    async fn mark_deleted(&self, owner: &str, codes: &[ShortCode]) -> Result<()> {
        match self {
            AnyStore::Memory(store) => store.mark_deleted(owner, codes).await,
            AnyStore::File(store) => store.mark_deleted(owner, codes).await,
            AnyStore::Postgres(store) => store.mark_deleted(owner, codes).await,
        }
    }

    async fn ping(&self) -> Result<()> {
        match self {
            AnyStore::Memory(store) => store.ping().await,
            AnyStore::File(store) => store.ping().await,
            AnyStore::Postgres(store) => store.ping().await,
        }
    }

    async fn count_urls(&self) -> Result<u64> {
        match self {
            AnyStore::Memory(store) => store.count_urls().await,
            AnyStore::File(store) => store.count_urls().await,
            AnyStore::Postgres(store) => store.count_urls().await,
        }
    }

    async fn count_users(&self) -> Result<u64> {
        match self {
            AnyStore::Memory(store) => store.count_users().await,
            AnyStore::File(store) => store.count_users().await,
            AnyStore::Postgres(store) => store.count_users().await,
        }
    }
}
