//! Persisted inventory, so a rerun can skip rescanning the filesystem.
//!
//! One CSV file per namespace at `{cache_dir}/{namespace}_raw_images_list.csv`.
//! Columns: `local_path`, `remainder`, `filename`, `remote_key`. Only
//! `local_path` and `remote_key` are read back; `s3_path` is accepted as an
//! older name for `remote_key`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::CacheError;
use crate::inventory::UploadCandidate;
use crate::keys::Namespace;

#[derive(Debug, Serialize)]
struct CacheRowOut<'a> {
    local_path: &'a Path,
    remainder: &'a str,
    filename: &'a str,
    remote_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct CacheRowIn {
    local_path: PathBuf,
    #[serde(alias = "s3_path")]
    remote_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryCache {
    path: PathBuf,
    namespace: Namespace,
}

impl InventoryCache {
    pub fn for_namespace(cache_dir: &Path, namespace: &Namespace) -> Self {
        Self {
            path: cache_dir.join(format!("{namespace}_raw_images_list.csv")),
            namespace: namespace.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<UploadCandidate>, CacheError> {
        info!(path = %self.path.display(), "Attempting load from cached image list");
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_error(e))?;
        let candidates = reader
            .deserialize::<CacheRowIn>()
            .map(|row| {
                row.map(|r| UploadCandidate {
                    local_path: r.local_path,
                    remote_key: r.remote_key,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.csv_error(e))?;
        info!(count = candidates.len(), "Loaded cached image list");
        Ok(candidates)
    }

    pub fn save(&self, candidates: &[UploadCandidate]) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                error!(error = ?e, path = %dir.display(), "Failed to create cache directory");
                CacheError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                }
            })?;
        }

        let marker = format!("/{}/", self.namespace);
        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| self.csv_error(e))?;
        for candidate in candidates {
            let filename = candidate
                .local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let remainder = candidate
                .remote_key
                .split_once(&marker)
                .map(|(_, rest)| rest)
                .unwrap_or(candidate.remote_key.as_str());
            writer
                .serialize(CacheRowOut {
                    local_path: &candidate.local_path,
                    remainder,
                    filename: &filename,
                    remote_key: &candidate.remote_key,
                })
                .map_err(|e| self.csv_error(e))?;
        }
        writer.flush().map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        info!(path = %self.path.display(), count = candidates.len(), "Wrote image list cache");
        Ok(())
    }

    fn csv_error(&self, e: csv::Error) -> CacheError {
        error!(error = %e, path = %self.path.display(), "Inventory cache error");
        CacheError::Csv {
            path: self.path.clone(),
            source: e,
        }
    }
}
