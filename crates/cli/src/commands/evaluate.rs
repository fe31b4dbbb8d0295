use super::{evaluate_once, report, snapshot_source};
use anyhow::Result;
use basket_hedge_core::config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
use basket_hedge_core::BasketVariant;
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;

/// Arguments for a single evaluation.
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Config file path
    #[arg(short, long, env = "BASKET_HEDGE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Evaluate a recorded snapshot instead of reading the ledger
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Evaluation instant for a replay, RFC 3339 (defaults to now)
    #[arg(long, requires = "replay")]
    pub as_of: Option<DateTime<Utc>>,

    /// Directory to record the fetched snapshot into
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Override the configured basket variant (two-hedge or single-hedge)
    #[arg(long)]
    pub variant: Option<BasketVariant>,

    /// Print the decision record as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: EvaluateArgs) -> Result<()> {
    let mut config = ConfigLoader::load_from(&args.config)?;
    if let Some(variant) = args.variant {
        config.hedge.variant = variant;
        config.hedge.validate()?;
    }
    let source = snapshot_source(&config, args.replay.as_deref())?;

    tracing::info!(source = source.name(), "Evaluating hedge");

    let record = evaluate_once(
        source.as_ref(),
        &config,
        args.as_of,
        args.record.as_deref(),
    )
    .await?;

    report(&record, args.json)
}
