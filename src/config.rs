use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::keys::{KeyLayout, Stage};

pub const DEFAULT_STORAGE_CLASS: &str = "GLACIER_IR";
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_CACHE_DIR: &str = "data";

/// Everything loaded from the settings file, with environment overrides applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreSettings,
    pub storage_class: String,
    pub cache_dir: PathBuf,
    pub layout: KeyLayout,
    pub reconcile: ReconcileSettings,
    pub workflows: BTreeMap<String, WorkflowSettings>,
}

impl Settings {
    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.store.bucket,
            storage_class = %self.storage_class,
            cache_dir = %self.cache_dir.display(),
            check_stage = %self.reconcile.stage,
            workflows = self.workflows.len(),
            "Loaded settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub bucket: String,
    pub endpoint_url: Option<String>,
}

/// Where to look for evidence that a raw image is already stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    #[serde(default = "ReconcileSettings::default_stage")]
    pub stage: Stage,
    /// Key suffix (without dot) an object must carry to count. Defaults per stage.
    #[serde(default)]
    pub suffix: Option<String>,
}

impl ReconcileSettings {
    fn default_stage() -> Stage {
        Stage::OcrJson
    }

    pub fn suffix(&self) -> &str {
        self.suffix
            .as_deref()
            .map(|s| s.trim_start_matches('.'))
            .unwrap_or_else(|| self.stage.default_suffix())
    }
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            stage: Self::default_stage(),
            suffix: None,
        }
    }
}

/// Where a workflow's scans live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub image_glob_root: PathBuf,
    pub image_glob_patterns: Vec<String>,
}

/// Per-run knobs for the upload pool.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub concurrency: usize,
    /// Minimum time each upload occupies its worker. Zero disables throttling.
    pub rate_limit: Duration,
    pub storage_class: String,
    pub dry_run: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit: Duration::ZERO,
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            dry_run: false,
        }
    }
}
