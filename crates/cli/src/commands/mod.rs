//! CLI commands for the hedge monitor.

pub mod evaluate;
pub mod schedule;

pub use evaluate::EvaluateArgs;
pub use schedule::ScheduleArgs;

use anyhow::{Context, Result};
use basket_hedge_core::{
    evaluate_at, AppConfig, DecisionFormatter, DecisionRecord, SnapshotSource,
};
use basket_hedge_data::{write_replay, LedgerSnapshotSource, ReplaySource, RpcLedger};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Live ledger source, or a recorded snapshot when `replay` is set.
fn snapshot_source(config: &AppConfig, replay: Option<&Path>) -> Result<Box<dyn SnapshotSource>> {
    match replay {
        Some(path) => Ok(Box::new(ReplaySource::new(path))),
        None => {
            let ledger = RpcLedger::new(&config.chain)?;
            Ok(Box::new(LedgerSnapshotSource::new(ledger)))
        }
    }
}

/// Fetch, optionally record, then evaluate one snapshot.
async fn evaluate_once(
    source: &dyn SnapshotSource,
    config: &AppConfig,
    as_of: Option<DateTime<Utc>>,
    record_dir: Option<&Path>,
) -> Result<DecisionRecord> {
    let snapshot = source
        .fetch()
        .await
        .with_context(|| format!("fetching snapshot from {}", source.name()))?;

    if let Some(dir) = record_dir {
        write_replay(dir, &snapshot).await?;
    }

    let now = as_of.unwrap_or_else(Utc::now);
    let record = evaluate_at(&snapshot, &config.shorts, &config.hedge, now)?;
    Ok(record)
}

fn report(record: &DecisionRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print!("{}", DecisionFormatter::format(record));
    }
    Ok(())
}
