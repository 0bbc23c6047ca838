//! CLI glue for deed-image-sync: argument parsing, settings loading and wiring
//! the S3 store into the core pipeline.
//!
//! All business logic lives in the library modules; this module only translates
//! flags into a [`SyncPlan`] and prints the outcome.
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::DEFAULT_CONCURRENCY;
use crate::contract::TokioClock;
use crate::load_config::{load_config, upload_settings};
use crate::store::S3Store;
use crate::synchronise::{synchronise, SyncPlan};

/// CLI for deed-image-sync: upload a workflow's scanned deed images to S3.
#[derive(Parser)]
#[clap(
    name = "deed-image-sync",
    version,
    about = "Upload local deed images that are not yet stored in the bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan, reconcile against the bucket and upload what is missing
    Upload(UploadArgs),
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Name of the workflow to process, e.g. "Ramsey County"
    #[clap(short, long)]
    pub workflow: Option<String>,

    /// Load the raw image list from cache instead of scanning the filesystem
    #[clap(short, long)]
    pub cache: bool,

    /// How many upload workers to run
    #[clap(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub pool: usize,

    /// Minimum seconds each upload occupies its worker (0 disables throttling)
    #[clap(short, long, default_value_t = 0.0)]
    pub rate_limit: f64,

    /// Report how many images would be uploaded without uploading them
    #[clap(long)]
    pub dry_run: bool,

    /// Path to the YAML settings file
    #[clap(long, default_value = "workflows.yaml")]
    pub config: PathBuf,
}

/// Async CLI entrypoint shared by main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Upload(args) => upload(args).await,
    }
}

async fn upload(args: UploadArgs) -> Result<()> {
    let workflow_name = match args.workflow.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            tracing::warn!("No workflow given, nothing to do");
            println!("Missing workflow name. Please specify with --workflow.");
            return Ok(());
        }
    };

    let settings = load_config(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let upload = upload_settings(&settings, Some(args.pool), args.rate_limit, args.dry_run)?;
    let plan = SyncPlan::from_settings(&settings, &workflow_name, args.cache, upload)?;
    tracing::info!(command = "upload", workflow = %workflow_name, "Starting upload run");

    let store = Arc::new(S3Store::from_settings(&settings.store).await);
    let report = match synchronise(&plan, store, Arc::new(TokioClock)).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(command = "upload", error = %e, "Synchronisation failed");
            eprintln!("[ERROR] {e}");
            return Err(e.into());
        }
    };

    println!(
        "Found {} images already uploaded, {} remaining...",
        report.already_uploaded, report.upload.pending
    );
    if report.upload.dry_run {
        println!("Dry run: {} images would be uploaded.", report.upload.pending);
        return Ok(());
    }
    println!(
        "Uploaded {} of {} images.",
        report.upload.uploaded.len(),
        report.upload.pending
    );
    if !report.upload.is_success() {
        for failure in &report.upload.failed {
            eprintln!("[FAILED] {} -> {}: {}", failure.local_path.display(), failure.remote_key, failure.error);
        }
        bail!("{} uploads failed", report.upload.failed.len());
    }
    tracing::info!(command = "upload", "Upload run complete");
    Ok(())
}
