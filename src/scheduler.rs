//! # scheduler: bounded, throttled upload pool
//!
//! A fixed number of worker tasks pull candidates from one shared queue. Each
//! worker uploads a single file at a time, so at most `concurrency` uploads are
//! ever in flight. With a non-zero rate limit, consecutive uploads of one worker
//! start at least `rate_limit` apart; other workers are unaffected, and nothing
//! waits after the last candidate.
//!
//! Failures are isolated: a failed upload is recorded in the
//! [`UploadReport`] and the worker carries on with the queue. Outcomes are
//! streamed back as they happen, so a worker that panics keeps the results it
//! already produced, and whatever it was holding is reported as failed.

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::UploadSettings;
use crate::contract::{Clock, RemoteStore};
use crate::inventory::UploadCandidate;

/// Error recorded for candidates whose worker stopped before reaching them.
pub const UNPROCESSED: &str = "not processed: upload worker stopped";

/// Outcome of a scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub dry_run: bool,
    /// Candidates handed to the scheduler.
    pub pending: usize,
    /// Keys uploaded successfully, in completion order.
    pub uploaded: Vec<String>,
    pub failed: Vec<UploadFailure>,
}

impl UploadReport {
    /// True when every pending candidate was uploaded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && (self.dry_run || self.uploaded.len() == self.pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub error: String,
}

enum Outcome {
    Uploaded(String),
    Failed(UploadFailure),
}

pub struct UploadScheduler<S: ?Sized, C: ?Sized> {
    store: Arc<S>,
    clock: Arc<C>,
    settings: UploadSettings,
}

impl<S, C> UploadScheduler<S, C>
where
    S: RemoteStore + ?Sized + 'static,
    C: Clock + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<C>, settings: UploadSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Uploads every candidate, or only counts them in dry-run mode.
    pub async fn run(&self, candidates: Vec<UploadCandidate>) -> UploadReport {
        let pending = candidates.len();
        if self.settings.dry_run {
            info!(pending, "Dry run: {} images would be uploaded", pending);
            return UploadReport {
                dry_run: true,
                pending,
                ..UploadReport::default()
            };
        }

        let worker_count = self.settings.concurrency.max(1).min(pending);
        info!(
            pending,
            workers = worker_count,
            rate_limit_secs = self.settings.rate_limit.as_secs_f64(),
            storage_class = %self.settings.storage_class,
            "Starting upload pool"
        );

        let (tx, rx) = async_channel::bounded::<UploadCandidate>(worker_count.max(1));
        let (outcome_tx, outcome_rx) = async_channel::unbounded::<Outcome>();
        let handles: Vec<_> = (0..worker_count)
            .map(|worker| {
                let rx = rx.clone();
                let outcome_tx = outcome_tx.clone();
                let store = Arc::clone(&self.store);
                let clock = Arc::clone(&self.clock);
                let settings = self.settings.clone();
                tokio::spawn(async move {
                    upload_worker(worker, rx, outcome_tx, store, clock, settings).await
                })
            })
            .collect();
        drop(rx);
        drop(outcome_tx);

        let expected = candidates.clone();
        for candidate in candidates {
            if tx.send(candidate).await.is_err() {
                error!("All upload workers stopped before the queue was drained");
                break;
            }
        }
        // Closing the queue lets idle workers exit.
        drop(tx);

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = ?e, "Upload worker panicked");
            }
        }

        let mut report = UploadReport {
            dry_run: false,
            pending,
            ..UploadReport::default()
        };
        while let Ok(outcome) = outcome_rx.try_recv() {
            match outcome {
                Outcome::Uploaded(key) => report.uploaded.push(key),
                Outcome::Failed(failure) => report.failed.push(failure),
            }
        }
        record_unprocessed(&mut report, expected);

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "Upload pool finished"
        );
        report
    }
}

/// Reports every candidate without an outcome as failed. Only a worker that
/// stopped mid-queue leaves candidates behind.
fn record_unprocessed(report: &mut UploadReport, expected: Vec<UploadCandidate>) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let reported = report
        .uploaded
        .iter()
        .chain(report.failed.iter().map(|f| &f.remote_key));
    for key in reported {
        *seen.entry(key.clone()).or_default() += 1;
    }

    for candidate in expected {
        match seen.get_mut(&candidate.remote_key) {
            Some(count) if *count > 0 => *count -= 1,
            _ => {
                warn!(key = %candidate.remote_key, "Candidate lost with a stopped upload worker");
                report.failed.push(UploadFailure {
                    local_path: candidate.local_path,
                    remote_key: candidate.remote_key,
                    error: UNPROCESSED.to_string(),
                });
            }
        }
    }
}

async fn upload_worker<S, C>(
    worker: usize,
    rx: async_channel::Receiver<UploadCandidate>,
    outcomes: async_channel::Sender<Outcome>,
    store: Arc<S>,
    clock: Arc<C>,
    settings: UploadSettings,
) where
    S: RemoteStore + ?Sized,
    C: Clock + ?Sized,
{
    // Earliest moment this worker may start its next upload.
    let mut next_start: Option<Instant> = None;
    while let Ok(candidate) = rx.recv().await {
        if !settings.rate_limit.is_zero() {
            let now = clock.now();
            let started = match next_start {
                Some(at) if now < at => {
                    let remaining = at - now;
                    debug!(worker, wait_ms = remaining.as_millis() as u64, "Throttling worker");
                    clock.sleep(remaining).await;
                    at
                }
                _ => now,
            };
            next_start = Some(started + settings.rate_limit);
        }
        info!(worker, key = %candidate.remote_key, "Uploading {}", candidate.remote_key);

        let result = store
            .upload_file(
                &candidate.local_path,
                &candidate.remote_key,
                &settings.storage_class,
            )
            .await;
        let outcome = match result {
            Ok(()) => Outcome::Uploaded(candidate.remote_key),
            Err(e) => {
                warn!(worker, key = %candidate.remote_key, error = %e, "Upload failed, continuing");
                Outcome::Failed(UploadFailure {
                    local_path: candidate.local_path,
                    remote_key: candidate.remote_key,
                    error: e.to_string(),
                })
            }
        };
        // The receiving side is held by run() until every worker is joined.
        let _ = outcomes.send(outcome).await;
    }
}
