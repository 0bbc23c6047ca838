//! # reconcile: drop candidates the bucket already accounts for
//!
//! Listing happens under one *check stage* (by default the OCR JSON stage, so an
//! image counts as stored once its OCR output exists). Listed keys and candidate
//! keys are both reduced to canonical raw keys and compared by set membership.
//!
//! This module only reads from the store.

use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ReconcileSettings;
use crate::contract::RemoteStore;
use crate::error::StoreError;
use crate::inventory::UploadCandidate;
use crate::keys::{normalize_to_canonical_raw_key, KeyLayout, Namespace};

pub struct Reconciler<S: ?Sized> {
    store: Arc<S>,
    layout: KeyLayout,
    settings: ReconcileSettings,
}

impl<S> Reconciler<S>
where
    S: RemoteStore + ?Sized,
{
    pub fn new(store: Arc<S>, layout: KeyLayout, settings: ReconcileSettings) -> Self {
        Self {
            store,
            layout,
            settings,
        }
    }

    /// Canonical raw keys of everything already present at the check stage.
    pub async fn already_stored(&self, namespace: &Namespace) -> Result<HashSet<String>, StoreError> {
        let stage = self.settings.stage;
        let prefix = self.layout.stage_prefix(stage, namespace);
        let key_filter = Regex::new(&format!(
            "^{}.+\\.{}$",
            regex::escape(&prefix),
            regex::escape(self.settings.suffix())
        ))
        .map_err(|e| StoreError::KeyFilter {
            prefix: prefix.clone(),
            source: e,
        })?;

        info!(prefix = %prefix, "Checking bucket to see what images have already been uploaded");
        let listed = self.store.list_keys(&prefix).await?;
        let listed_count = listed.len();

        let canonical: HashSet<String> = listed
            .into_iter()
            .filter(|key| key_filter.is_match(key))
            .map(|key| self.layout.canonical_raw_key_for(stage, &key))
            .collect();
        debug!(listed = listed_count, matching = canonical.len(), "Canonicalized remote keys");
        Ok(canonical)
    }

    /// Candidates whose canonical raw key is not yet present remotely, in input order.
    pub async fn filter_unuploaded(
        &self,
        namespace: &Namespace,
        candidates: Vec<UploadCandidate>,
    ) -> Result<Vec<UploadCandidate>, StoreError> {
        let total = candidates.len();
        let stored = self.already_stored(namespace).await?;
        let remaining = compare_key_sets(candidates, &stored);
        info!(
            already_uploaded = total - remaining.len(),
            remaining = remaining.len(),
            "Found {} images already uploaded, {} remaining",
            total - remaining.len(),
            remaining.len()
        );
        Ok(remaining)
    }
}

/// Stable filter: keeps candidates whose normalized key is not in `canonical_keys`.
pub fn compare_key_sets(
    candidates: Vec<UploadCandidate>,
    canonical_keys: &HashSet<String>,
) -> Vec<UploadCandidate> {
    if canonical_keys.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| !canonical_keys.contains(&normalize_to_canonical_raw_key(&c.remote_key)))
        .collect()
}
