use clap::{Parser, ValueEnum};
use curtail_core::StoreError;
use curtail_storage::AnyStore;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

pub const BASE_URL_ENV: &str = "CURTAIL_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "CURTAIL_STORAGE_BACKEND";
pub const FILE_PATH_ENV: &str = "CURTAIL_FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "CURTAIL_DATABASE_DSN";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "file")]
    File,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file path is required when storage backend is file")]
    MissingFilePath,
    #[error("database dsn is required when storage backend is postgres")]
    MissingDatabaseDsn,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Process configuration, from flags or environment.
#[derive(Debug, Parser)]
#[command(name = "curtail")]
pub struct Config {
    /// Base URL that short codes are appended to.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    /// Record log location for the file backend.
    #[arg(long, env = FILE_PATH_ENV, required_if_eq("storage", "file"))]
    pub file_path: Option<PathBuf>,

    #[arg(long, env = DATABASE_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub database_dsn: Option<String>,
}

impl Config {
    /// Builds the configured storage backend.
    pub async fn build_store(&self) -> Result<AnyStore, ConfigError> {
        match self.storage {
            StorageBackendArg::InMemory => Ok(AnyStore::memory()),
            StorageBackendArg::File => {
                let path = self.file_path.as_ref().ok_or(ConfigError::MissingFilePath)?;
                Ok(AnyStore::file(path).await?)
            }
            StorageBackendArg::Postgres => {
                let dsn = self
                    .database_dsn
                    .as_ref()
                    .ok_or(ConfigError::MissingDatabaseDsn)?;
                Ok(AnyStore::postgres(dsn).await?)
            }
        }
    }
}
