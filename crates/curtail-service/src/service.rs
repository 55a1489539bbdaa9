use crate::deleter::{Deleter, DeleterSettings};
use crate::error::ServiceError;
use curtail_core::{BatchEntry, ShortCode, UrlStore};
use curtail_idgen::CodeGenerator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One item of a batch-create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// One item of a batch-create response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResultItem {
    pub correlation_id: String,
    pub short_url: String,
}

/// The result of creating a single short link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
    /// The full short URL (base URL joined with the code).
    pub short_url: String,
    /// True when the URL was already known and the existing code was
    /// returned instead of creating a new one.
    pub existing: bool,
}

/// One of the caller's live links, with the code expanded to a full
/// short URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedLink {
    pub short_url: String,
    pub original_url: String,
}

/// Aggregate service statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub urls: u64,
    pub users: u64,
}

/// The operations exposed to transport adapters, composed from a
/// storage backend, a code generator for batch hints, and the
/// asynchronous deletion pipeline.
pub struct LinkService<S, G> {
    base_url: String,
    store: Arc<S>,
    generator: Arc<G>,
    deleter: Deleter,
}

impl<S: UrlStore, G: CodeGenerator> LinkService<S, G> {
    /// Creates a service with default pipeline settings and starts the
    /// deletion worker.
    pub fn new(base_url: impl Into<String>, store: S, generator: G) -> Self {
        Self::with_settings(base_url, store, generator, DeleterSettings::default())
    }

    /// Creates a service with explicit pipeline settings.
    pub fn with_settings(
        base_url: impl Into<String>,
        store: S,
        generator: G,
        settings: DeleterSettings,
    ) -> Self {
        let store = Arc::new(store);
        let deleter = Deleter::spawn(Arc::clone(&store), settings);

        Self {
            base_url: base_url.into(),
            store,
            generator: Arc::new(generator),
            deleter,
        }
    }

    /// Creates a short link for `original` and returns its full short
    /// URL, flagging whether the URL already existed.
    pub async fn create_short(
        &self,
        owner: &str,
        original: &str,
    ) -> Result<CreatedLink, ServiceError> {
        let original = original.trim();
        if original.is_empty() {
            return Err(ServiceError::EmptyUrl);
        }

        let outcome = self.store.save_url(owner, original).await?;
        Ok(CreatedLink {
            existing: outcome.is_existing(),
            short_url: outcome.code().to_url(&self.base_url),
        })
    }

    /// Creates several short links in one backend call. Codes are
    /// generated up front so the results can be returned regardless of
    /// which entries the backend ends up skipping.
    pub async fn create_short_batch(
        &self,
        owner: &str,
        items: Vec<BatchRequestItem>,
    ) -> Result<Vec<BatchResultItem>, ServiceError> {
        let mut entries = Vec::with_capacity(items.len());
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            let code = self.generator.generate();
            results.push(BatchResultItem {
                correlation_id: item.correlation_id.clone(),
                short_url: code.to_url(&self.base_url),
            });
            entries.push(BatchEntry {
                code,
                original_url: item.original_url,
                correlation_id: item.correlation_id,
            });
        }

        self.store.batch_save(owner, &entries).await?;
        Ok(results)
    }

    /// Resolves a short code to its original URL. Unknown, deleted and
    /// syntactically invalid codes are all a normal `None`.
    pub async fn resolve_short(&self, raw_code: &str) -> Result<Option<String>, ServiceError> {
        let Ok(code) = ShortCode::new(raw_code) else {
            return Ok(None);
        };
        Ok(self.store.get_url(&code).await?)
    }

    /// Lists the caller's live links with expanded short URLs.
    pub async fn user_links(&self, owner: &str) -> Result<Vec<OwnedLink>, ServiceError> {
        let links = self.store.user_urls(owner).await?;
        Ok(links
            .into_iter()
            .map(|link| OwnedLink {
                short_url: link.code.to_url(&self.base_url),
                original_url: link.original_url,
            })
            .collect())
    }

    /// Queues the caller's codes for asynchronous soft deletion.
    ///
    /// Returns once the request is enqueued; the actual marking
    /// happens at the pipeline's next flush. Invalid codes are
    /// rejected up front.
    pub async fn delete_links(
        &self,
        owner: &str,
        raw_codes: Vec<String>,
    ) -> Result<(), ServiceError> {
        let mut codes = Vec::with_capacity(raw_codes.len());
        for raw in raw_codes {
            codes.push(ShortCode::new(&raw).map_err(|_| ServiceError::InvalidCode(raw))?);
        }

        self.deleter.enqueue(owner, codes).await
    }

    /// Probes the backend.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.store.ping().await?)
    }

    /// Aggregate counts for observability.
    pub async fn stats(&self) -> Result<Stats, ServiceError> {
        let urls = self.store.count_urls().await?;
        let users = self.store.count_users().await?;
        Ok(Stats { urls, users })
    }

    /// Stops the deletion pipeline after a final flush of everything
    /// pending.
    pub async fn shutdown(&self) {
        self.deleter.shutdown().await;
    }
}
