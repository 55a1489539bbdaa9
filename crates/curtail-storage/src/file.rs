use async_trait::async_trait;
use curtail_core::error::{Result, StoreError};
use curtail_core::link::{BatchEntry, SaveOutcome, ShortCode, UserLink};
use curtail_core::store::UrlStore;
use curtail_idgen::CodeGenerator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

const SAVE_ATTEMPTS: u32 = 3;

/// One line of the append-only record log.
#[derive(Debug, Serialize, Deserialize)]
struct LogRecord {
    /// Opaque per-write token.
    uuid: String,
    short_url: String,
    original_url: String,
}

struct Inner {
    data: HashMap<ShortCode, String>,
    log: File,
}

/// In-memory store backed by an append-only record log.
///
/// Every successful write appends one JSON record before it completes,
/// so the map can be rebuilt by replaying the log on startup. The log
/// is never compacted; later records for a code win over earlier ones.
///
/// The map and the log file sit behind one lock: a write (map insert
/// plus file append) is a single exclusive section, reads share.
///
/// Owner tracking and soft deletion are not represented in the log
/// schema, so this variant carries the same capability gaps as the
/// volatile store.
pub struct FileStore<G> {
    inner: RwLock<Inner>,
    generator: G,
}

impl<G: CodeGenerator> FileStore<G> {
    /// Opens (or creates) the log at `path` and replays it.
    ///
    /// Malformed lines are skipped, never fatal: a torn final write
    /// must not brick the store on the next start.
    pub async fn open(path: impl AsRef<Path>, generator: G) -> Result<Self> {
        let path = path.as_ref();
        let data = Self::replay(path).await?;

        let log = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await
            .map_err(io_error)?;

        Ok(Self {
            inner: RwLock::new(Inner { data, log }),
            generator,
        })
    }

    async fn replay(path: &Path) -> Result<HashMap<ShortCode, String>> {
        let mut data = HashMap::new();

        let file = match File::open(path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(data),
            Err(err) => return Err(io_error(err)),
        };

        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines.next_line().await.map_err(io_error)? {
            let Ok(record) = serde_json::from_str::<LogRecord>(&line) else {
                debug!(%line, "skipping malformed log line");
                continue;
            };
            let Ok(code) = ShortCode::new(record.short_url) else {
                debug!(%line, "skipping log line with invalid short code");
                continue;
            };
            // Last write wins per code.
            data.insert(code, record.original_url);
        }

        Ok(data)
    }

    /// Inserts or overwrites a mapping in memory only, without touching
    /// the log. Test seam.
    pub async fn force_set(&self, code: ShortCode, url: impl Into<String>) {
        self.inner.write().await.data.insert(code, url.into());
    }

    async fn append(log: &mut File, code: &ShortCode, original: &str) -> Result<()> {
        let record = LogRecord {
            uuid: Uuid::new_v4().to_string(),
            short_url: code.as_str().to_owned(),
            original_url: original.to_owned(),
        };

        let mut line =
            serde_json::to_vec(&record).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        line.push(b'\n');

        log.write_all(&line).await.map_err(io_error)?;
        log.flush().await.map_err(io_error)?;
        Ok(())
    }
}

fn io_error(err: std::io::Error) -> StoreError {
    StoreError::Io(err.to_string())
}

#[async_trait]
impl<G: CodeGenerator> UrlStore for FileStore<G> {
    async fn save_url(&self, _owner: &str, original: &str) -> Result<SaveOutcome> {
        let mut inner = self.inner.write().await;

        for _ in 0..SAVE_ATTEMPTS {
            let code = self.generator.generate();
            if inner.data.contains_key(&code) {
                continue;
            }

            // The write is complete only once the append has returned;
            // the map must not run ahead of the log.
            Self::append(&mut inner.log, &code, original).await?;
            inner.data.insert(code.clone(), original.to_owned());
            return Ok(SaveOutcome::Created(code));
        }

        Err(StoreError::CollisionExhausted {
            attempts: SAVE_ATTEMPTS,
        })
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        Ok(self.inner.read().await.data.get(code).cloned())
    }

    async fn batch_save(&self, _owner: &str, entries: &[BatchEntry]) -> Result<()> {
        let mut inner = self.inner.write().await;

        for entry in entries {
            if inner.data.contains_key(&entry.code) {
                continue;
            }
            Self::append(&mut inner.log, &entry.code, &entry.original_url).await?;
            inner
                .data
                .insert(entry.code.clone(), entry.original_url.clone());
        }

        Ok(())
    }

    async fn user_urls(&self, _owner: &str) -> Result<Vec<UserLink>> {
        // No owner tracking in the log schema.
        Ok(Vec::new())
    }

    async fn mark_deleted(&self, _owner: &str, _codes: &[ShortCode]) -> Result<()> {
        Err(StoreError::Unsupported("mark_deleted"))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn count_urls(&self) -> Result<u64> {
        Ok(self.inner.read().await.data.len() as u64)
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(0)
    }
}
