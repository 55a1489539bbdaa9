use async_trait::async_trait;
use curtail_core::error::{Result, StoreError};
use curtail_core::link::{BatchEntry, SaveOutcome, ShortCode, UserLink};
use curtail_core::store::UrlStore;
use curtail_idgen::CodeGenerator;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// How many candidate codes a save tries before giving up.
const SAVE_ATTEMPTS: u32 = 3;

/// Volatile in-memory implementation of the storage contract.
///
/// Holds a single code-to-URL map and nothing else: no owner tracking,
/// no delete flag, no content deduplication. Saving the same URL twice
/// produces two codes. Everything is lost on restart.
///
/// DashMap's sharded locks let reads proceed concurrently while a
/// write holds only its bucket.
#[derive(Debug)]
pub struct InMemoryStore<G> {
    data: DashMap<ShortCode, String>,
    generator: G,
}

impl<G: CodeGenerator> InMemoryStore<G> {
    /// Creates an empty in-memory store.
    pub fn new(generator: G) -> Self {
        Self {
            data: DashMap::new(),
            generator,
        }
    }

    /// Inserts or overwrites a mapping directly, bypassing code
    /// generation. Test seam.
    pub fn force_set(&self, code: ShortCode, url: impl Into<String>) {
        self.data.insert(code, url.into());
    }
}

#[async_trait]
impl<G: CodeGenerator> UrlStore for InMemoryStore<G> {
    async fn save_url(&self, _owner: &str, original: &str) -> Result<SaveOutcome> {
        for _ in 0..SAVE_ATTEMPTS {
            let code = self.generator.generate();
            match self.data.entry(code.clone()) {
                // Never overwrite a different URL under a colliding code.
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(original.to_owned());
                    return Ok(SaveOutcome::Created(code));
                }
            }
        }

        Err(StoreError::CollisionExhausted {
            attempts: SAVE_ATTEMPTS,
        })
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        Ok(self.data.get(code).map(|entry| entry.value().clone()))
    }

    async fn batch_save(&self, _owner: &str, entries: &[BatchEntry]) -> Result<()> {
        for entry in entries {
            if let Entry::Vacant(slot) = self.data.entry(entry.code.clone()) {
                slot.insert(entry.original_url.clone());
            }
        }
        Ok(())
    }

    async fn user_urls(&self, _owner: &str) -> Result<Vec<UserLink>> {
        // No owner tracking in this variant.
        Ok(Vec::new())
    }

    async fn mark_deleted(&self, _owner: &str, _codes: &[ShortCode]) -> Result<()> {
        Err(StoreError::Unsupported("mark_deleted"))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn count_urls(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(0)
    }
}
