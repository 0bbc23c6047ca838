//! High-level pipeline: inventory → reconcile → upload for one workflow.
//!
//! # Steps
//! 1. Build the local inventory, either by scanning the workflow's glob patterns
//!    (and refreshing the on-disk cache unless this is a dry run) or by loading the cache. A cache that
//!    cannot be read aborts the run before any remote call.
//! 2. Drop candidates whose canonical raw key already exists at the check stage.
//! 3. Hand the remainder to the [`UploadScheduler`] (or only count it on a dry run).
//!
//! Steps 1 and 2 complete fully before any upload starts.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::cache::InventoryCache;
use crate::config::{ReconcileSettings, Settings, UploadSettings, WorkflowSettings};
use crate::contract::{Clock, RemoteStore};
use crate::error::{ConfigError, SyncError};
use crate::inventory::{build_inventory, UploadCandidate};
use crate::keys::{KeyLayout, Namespace};
use crate::load_config::workflow;
use crate::reconcile::Reconciler;
use crate::scheduler::{UploadReport, UploadScheduler};

/// Everything one run needs, resolved from settings and CLI flags.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub workflow_name: String,
    pub namespace: Namespace,
    pub workflow: WorkflowSettings,
    pub layout: KeyLayout,
    pub reconcile: ReconcileSettings,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    pub upload: UploadSettings,
}

impl SyncPlan {
    pub fn from_settings(
        settings: &Settings,
        workflow_name: &str,
        use_cache: bool,
        upload: UploadSettings,
    ) -> Result<Self, ConfigError> {
        let workflow = workflow(settings, workflow_name)?.clone();
        Ok(Self {
            workflow_name: workflow_name.to_string(),
            namespace: Namespace::from_workflow_name(workflow_name),
            workflow,
            layout: settings.layout.clone(),
            reconcile: settings.reconcile.clone(),
            cache_dir: settings.cache_dir.clone(),
            use_cache,
            upload,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SynchroniseReport {
    pub workflow: String,
    pub namespace: String,
    pub local_images: usize,
    pub already_uploaded: usize,
    pub upload: UploadReport,
}

pub async fn synchronise<S, C>(
    plan: &SyncPlan,
    store: Arc<S>,
    clock: Arc<C>,
) -> Result<SynchroniseReport, SyncError>
where
    S: RemoteStore + ?Sized + 'static,
    C: Clock + ?Sized + 'static,
{
    info!(workflow = %plan.workflow_name, namespace = %plan.namespace, "[SYNC] Starting synchronisation");

    let candidates = gather_inventory(plan)?;
    let local_images = candidates.len();

    let reconciler = Reconciler::new(
        Arc::clone(&store),
        plan.layout.clone(),
        plan.reconcile.clone(),
    );
    let remaining = reconciler
        .filter_unuploaded(&plan.namespace, candidates)
        .await
        .map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Reconciliation failed");
            SyncError::from(e)
        })?;

    let scheduler = UploadScheduler::new(store, clock, plan.upload.clone());
    let already_uploaded = local_images - remaining.len();
    let upload = scheduler.run(remaining).await;

    let report = SynchroniseReport {
        workflow: plan.workflow_name.clone(),
        namespace: plan.namespace.to_string(),
        local_images,
        already_uploaded,
        upload,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "[SYNC][DEBUG] Report as JSON"),
        Err(e) => error!(error = ?e, "[SYNC][DEBUG] Failed to serialize report as JSON"),
    }
    Ok(report)
}

/// Step 1: scan (and refresh the cache outside dry run) or load the cached inventory.
pub fn gather_inventory(plan: &SyncPlan) -> Result<Vec<UploadCandidate>, SyncError> {
    let cache = InventoryCache::for_namespace(&plan.cache_dir, &plan.namespace);
    if plan.use_cache {
        return cache.load().map_err(|e| {
            error!(error = %e, path = %cache.path().display(), "[SYNC][ERROR] Can't read cached file list");
            SyncError::CacheLoad(e)
        });
    }

    let candidates = build_inventory(
        &plan.layout,
        &plan.namespace,
        &plan.workflow.image_glob_root,
        &plan.workflow.image_glob_patterns,
    )?;
    if plan.upload.dry_run {
        info!(path = %cache.path().display(), "[SYNC] Dry run: image list cache left untouched");
    } else {
        cache.save(&candidates).map_err(SyncError::CacheSave)?;
    }
    Ok(candidates)
}
