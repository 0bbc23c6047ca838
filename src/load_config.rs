/// `load_config` module: loads the static YAML settings file and injects the
/// environment-provided bucket name into the internal [`Settings`].
///
/// The YAML file carries no secrets. AWS credentials are resolved by the SDK from
/// the environment; the bucket may come from either the file or
/// `AWS_STORAGE_BUCKET_NAME` (the environment wins).
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::config::{
    ReconcileSettings, Settings, StoreSettings, UploadSettings, WorkflowSettings,
    DEFAULT_CACHE_DIR, DEFAULT_CONCURRENCY, DEFAULT_STORAGE_CLASS,
};
use crate::error::ConfigError;
use crate::keys::KeyLayout;

pub const BUCKET_ENV_VAR: &str = "AWS_STORAGE_BUCKET_NAME";

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    bucket: Option<String>,
    #[serde(default)]
    endpoint_url: Option<String>,
    #[serde(default)]
    storage_class: Option<String>,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    layout: KeyLayout,
    #[serde(default)]
    reconcile: ReconcileSettings,
    #[serde(default)]
    workflows: BTreeMap<String, WorkflowSettings>,
}

/// Loads a static YAML settings file and merges in the bucket from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ConfigError::Read {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(ConfigError::Parse(e));
        }
    };

    let bucket = match std::env::var(BUCKET_ENV_VAR) {
        Ok(bucket) if !bucket.trim().is_empty() => {
            info!(env = BUCKET_ENV_VAR, "Bucket name taken from environment");
            bucket
        }
        _ => match raw.bucket.filter(|b| !b.trim().is_empty()) {
            Some(bucket) => bucket,
            None => {
                error!(env = BUCKET_ENV_VAR, "No bucket in config file or environment");
                return Err(ConfigError::MissingBucket);
            }
        },
    };

    let settings = Settings {
        store: StoreSettings {
            bucket,
            endpoint_url: raw.endpoint_url,
        },
        storage_class: raw
            .storage_class
            .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
        cache_dir: raw.cache_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
        layout: raw.layout,
        reconcile: raw.reconcile,
        workflows: raw.workflows,
    };
    settings.trace_loaded();
    Ok(settings)
}

/// Looks up a workflow by its human-readable name.
pub fn workflow<'a>(settings: &'a Settings, name: &str) -> Result<&'a WorkflowSettings, ConfigError> {
    settings.workflows.get(name).ok_or_else(|| {
        error!(workflow = name, "Workflow not found in config");
        ConfigError::UnknownWorkflow(name.to_string())
    })
}

/// Validates CLI-provided pool options into [`UploadSettings`].
pub fn upload_settings(
    settings: &Settings,
    pool: Option<usize>,
    rate_limit_secs: f64,
    dry_run: bool,
) -> Result<UploadSettings, ConfigError> {
    let concurrency = pool.unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        return Err(ConfigError::ZeroConcurrency);
    }
    if !rate_limit_secs.is_finite() || rate_limit_secs < 0.0 {
        return Err(ConfigError::InvalidRateLimit(rate_limit_secs));
    }
    Ok(UploadSettings {
        concurrency,
        rate_limit: Duration::from_secs_f64(rate_limit_secs),
        storage_class: settings.storage_class.clone(),
        dry_run,
    })
}
