//! Periodic evaluation against the live ledger.
//!
//! Each tick reads the latest configuration published by the file watcher.
//! The first fetch or gate failure stops the loop; an unreliable decision is
//! never followed by another run.

use super::{evaluate_once, report, snapshot_source};
use anyhow::Result;
use basket_hedge_core::config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
use basket_hedge_core::{AppConfig, ConfigWatcher, SnapshotSource};
use clap::Args;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;

/// Arguments for scheduled evaluation.
#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Config file path
    #[arg(short, long, env = "BASKET_HEDGE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Seconds between evaluations
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,

    /// Directory to record every fetched snapshot into
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Print each decision record as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ScheduleArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    let (watcher, config_rx) = ConfigWatcher::new(config, args.config.clone());

    let watch_handle = tokio::spawn(async move {
        if let Err(e) = watcher.watch().await {
            tracing::warn!("Config watcher stopped, keeping current config: {e:#}");
        }
    });

    tracing::info!(interval_secs = args.interval_secs, "Starting scheduled evaluation");
    tracing::info!("Press Ctrl+C to stop");

    let result = schedule_loop(
        &config_rx,
        Duration::from_secs(args.interval_secs),
        |config| snapshot_source(config, None),
        args.record.as_deref(),
        args.json,
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
    )
    .await;

    watch_handle.abort();
    result
}

/// Runs one tick per `period` until a tick fails or `shutdown` resolves.
///
/// The source is rebuilt from the current config on every tick, so chain
/// settings picked up by the watcher apply from the next tick on.
async fn schedule_loop<F>(
    config_rx: &watch::Receiver<AppConfig>,
    period: Duration,
    source_for: F,
    record_dir: Option<&Path>,
    json: bool,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    F: Fn(&AppConfig) -> Result<Box<dyn SnapshotSource>>,
{
    let mut ticker = interval(period);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let config = config_rx.borrow().clone();
                let source = source_for(&config)?;
                run_tick(source.as_ref(), &config, record_dir, json).await?;
            }
            () = &mut shutdown => {
                tracing::info!("Shutdown requested, stopping scheduled evaluation");
                return Ok(());
            }
        }
    }
}

/// Fetches, evaluates and reports one snapshot.
async fn run_tick(
    source: &dyn SnapshotSource,
    config: &AppConfig,
    record_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let record = evaluate_once(source, config, None, record_dir).await?;
    report(&record, json)?;
    tracing::debug!(source = source.name(), "Scheduled evaluation complete");
    Ok(())
}
