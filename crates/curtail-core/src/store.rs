use crate::error::Result;
use crate::link::{BatchEntry, SaveOutcome, ShortCode, UserLink};
use async_trait::async_trait;

/// The storage contract implemented by every backend.
///
/// Backends differ in durability and capabilities, not in shape. The
/// in-memory and file-log variants do not track owners or deletion:
/// for those, [`mark_deleted`](UrlStore::mark_deleted) reports
/// `StoreError::Unsupported`, [`user_urls`](UrlStore::user_urls)
/// returns an empty list and [`count_users`](UrlStore::count_users)
/// returns zero. That is a documented capability gap, not a failure.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Stores a URL under a generated short code and returns it.
    ///
    /// Content-deduplicating backends return the existing code as
    /// [`SaveOutcome::Existing`] when the URL is already known.
    async fn save_url(&self, owner: &str, original: &str) -> Result<SaveOutcome>;

    /// Returns the original URL for a code, or `None` if the code is
    /// unknown or soft-deleted.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Inserts a batch of entries with pre-generated code hints.
    /// Entries whose code (or URL) already exists are skipped.
    async fn batch_save(&self, owner: &str, entries: &[BatchEntry]) -> Result<()>;

    /// Lists the owner's live links.
    async fn user_urls(&self, owner: &str) -> Result<Vec<UserLink>>;

    /// Soft-deletes the given codes, but only those owned by `owner`.
    /// Non-matching codes are ignored.
    async fn mark_deleted(&self, owner: &str, codes: &[ShortCode]) -> Result<()>;

    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Number of live links.
    async fn count_urls(&self) -> Result<u64>;

    /// Number of distinct owners.
    async fn count_users(&self) -> Result<u64>;
}
