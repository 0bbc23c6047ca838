//! Error types shared across the sync pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to list objects under {prefix}: {message}")]
    List { prefix: String, message: String },

    #[error("failed to upload {local_path} to {key}: {message}")]
    Upload {
        local_path: PathBuf,
        key: String,
        message: String,
    },

    #[error("invalid key filter for {prefix}: {source}")]
    KeyFilter {
        prefix: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure resolving the local inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to read {path} while scanning: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not under the image root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Failure reading or writing the persisted inventory.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failure loading the YAML settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unknown workflow {0:?}; add it under `workflows` in the config file")]
    UnknownWorkflow(String),

    #[error("no bucket configured; set `bucket` in the config file or AWS_STORAGE_BUCKET_NAME")]
    MissingBucket,

    #[error("worker pool size must be greater than zero")]
    ZeroConcurrency,

    #[error("invalid rate limit {0}; expected a non-negative number of seconds")]
    InvalidRateLimit(f64),
}

/// Failure of a whole synchronisation run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("can't read cached file list ({0}); try again without the --cache flag")]
    CacheLoad(#[source] CacheError),

    #[error("failed to write inventory cache: {0}")]
    CacheSave(#[source] CacheError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
