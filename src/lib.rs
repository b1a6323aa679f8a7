pub mod azure;
pub mod batch;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod provision;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

pub use crate::error::AzFederateError;

use crate::azure::AzureCli;
use crate::batch::BatchSummary;
use crate::executor::CommandExecutor;
use crate::provision::RepoProvisioner;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Loads and validates the manifest at `file`.
fn load_validated(file: &camino::Utf8Path) -> Result<config::Manifest> {
    let manifest = config::load_manifest(file)
        .with_context(|| format!("failed to load manifest from {}", file))?;
    manifest.validate().context("manifest validation failed")?;
    Ok(manifest)
}

/// Replication-lag pauses are pointless when no command runs.
fn replication_wait(manifest: &config::Manifest, dry_run: bool) -> Duration {
    if dry_run {
        Duration::ZERO
    } else {
        Duration::from_secs(manifest.replication_wait_secs)
    }
}

/// Runs the batch driver over every repository in the manifest.
///
/// The authentication pre-flight (`az account show`) happens before any
/// provisioning; its failure aborts the whole run. Per-repository failures
/// do not: they end up as `Failed` entries in the returned summary.
pub fn run_provision(
    opts: &cli::ProvisionArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<BatchSummary> {
    let manifest = load_validated(opts.common.file.as_path())?;

    let azure = AzureCli::new(executor);
    let session = azure
        .show_account()
        .context("authentication check failed (is `az login` done?)")?;

    let wait = replication_wait(&manifest, opts.dry_run);
    let provisioner = RepoProvisioner::new(&azure, &session, manifest.retry.policy(), wait);

    Ok(batch::run_batch(&manifest, &provisioner))
}

/// Runs the one-time bootstrap for the automation's own identity.
pub fn run_bootstrap(opts: &cli::BootstrapArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let manifest = load_validated(opts.common.file.as_path())?;
    // Fail on a missing bootstrap section before touching the network.
    manifest.bootstrap_settings()?;

    let azure = AzureCli::new(executor);
    let session = azure
        .show_account()
        .context("authentication check failed (is `az login` done?)")?;

    let wait = replication_wait(&manifest, opts.dry_run);
    let provisioner = RepoProvisioner::new(&azure, &session, manifest.retry.policy(), wait);

    bootstrap::run_bootstrap(&manifest, &provisioner)
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let manifest = load_validated(opts.common.file.as_path())?;
    info!("validation successful:\n{:#?}", manifest);
    Ok(())
}
