use async_trait::async_trait;
use curtail_core::error::{Result, StoreError};
use curtail_core::link::{BatchEntry, SaveOutcome, ShortCode, UserLink};
use curtail_core::store::UrlStore;
use curtail_idgen::CodeGenerator;
use sqlx::{PgPool, Row};

/// How many candidate codes `save_url` tries before giving up.
const SAVE_ATTEMPTS: u32 = 3;

/// Postgres implementation of the storage contract, the source of
/// truth when configured.
///
/// Uniqueness lives in the schema: `short_url` is the key and
/// `original_url` carries a unique constraint, which is what makes the
/// content-dedup and collision-retry semantics possible. Soft delete
/// is a boolean flag; reads only return live rows. Concurrency is
/// delegated to the connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore<G> {
    pool: PgPool,
    generator: G,
}

impl<G: CodeGenerator> PostgresStore<G> {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool, generator: G) -> Self {
        Self { pool, generator }
    }

    /// Creates a store by opening a new connection pool.
    pub async fn connect(database_url: &str, generator: G) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool, generator))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the backing table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS short_urls (
                short_url TEXT PRIMARY KEY,
                original_url TEXT UNIQUE NOT NULL,
                user_id TEXT,
                correlation_id TEXT,
                deleted BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

#[async_trait]
impl<G: CodeGenerator> UrlStore for PostgresStore<G> {
    async fn save_url(&self, owner: &str, original: &str) -> Result<SaveOutcome> {
        for _ in 0..SAVE_ATTEMPTS {
            let code = self.generator.generate();

            let inserted = sqlx::query_scalar::<_, String>(
                r#"
                INSERT INTO short_urls (short_url, original_url, user_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (original_url) DO NOTHING
                RETURNING short_url
                "#,
            )
            .bind(code.as_str())
            .bind(original)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await;

            match inserted {
                Ok(Some(_)) => return Ok(SaveOutcome::Created(code)),
                Ok(None) => {
                    // The URL is already stored (possibly soft-deleted;
                    // the unique constraint spans deleted rows). Hand
                    // back its existing code.
                    let existing = sqlx::query_scalar::<_, String>(
                        r#"SELECT short_url FROM short_urls WHERE original_url = $1"#,
                    )
                    .bind(original)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                    return Ok(SaveOutcome::Existing(ShortCode::new_unchecked(existing)));
                }
                // Unique violation here can only be the short_url key:
                // two URLs drew the same candidate code. Try another.
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(map_sqlx_error(err)),
            }
        }

        Err(StoreError::CollisionExhausted {
            attempts: SAVE_ATTEMPTS,
        })
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT original_url
            FROM short_urls
            WHERE short_url = $1
              AND NOT deleted
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn batch_save(&self, owner: &str, entries: &[BatchEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for entry in entries {
            // Bare DO NOTHING: a taken code *or* a taken URL skips the
            // entry instead of aborting the whole transaction.
            sqlx::query(
                r#"
                INSERT INTO short_urls (short_url, original_url, user_id, correlation_id)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(entry.code.as_str())
            .bind(&entry.original_url)
            .bind(owner)
            .bind(&entry.correlation_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn user_urls(&self, owner: &str) -> Result<Vec<UserLink>> {
        let rows = sqlx::query(
            r#"
            SELECT short_url, original_url
            FROM short_urls
            WHERE user_id = $1
              AND NOT deleted
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut links = Vec::with_capacity(rows.len());
        for row in rows {
            let code: String = row.try_get("short_url").map_err(map_sqlx_error)?;
            let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
            links.push(UserLink {
                code: ShortCode::new_unchecked(code),
                original_url,
            });
        }

        Ok(links)
    }

    async fn mark_deleted(&self, owner: &str, codes: &[ShortCode]) -> Result<()> {
        if codes.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = codes.iter().map(|c| c.as_str().to_owned()).collect();

        sqlx::query(
            r#"
            UPDATE short_urls
            SET deleted = TRUE
            WHERE user_id = $1
              AND short_url = ANY($2)
            "#,
        )
        .bind(owner)
        .bind(&ids)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn count_urls(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM short_urls WHERE NOT deleted"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn count_users(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(DISTINCT user_id) FROM short_urls WHERE NOT deleted"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
