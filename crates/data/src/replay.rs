//! Recorded snapshots.
//!
//! A replay file is one `InputSnapshot` serialised as JSON. Recording the
//! live snapshot alongside each run lets a decision be re-evaluated later
//! against exactly the inputs it saw.

use anyhow::{Context, Result};
use async_trait::async_trait;
use basket_hedge_core::{InputSnapshot, SnapshotSource};
use std::path::{Path, PathBuf};

pub struct ReplaySource {
    path: PathBuf,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for ReplaySource {
    async fn fetch(&self) -> Result<InputSnapshot> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading replay file {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("parsing replay file {}", self.path.display()))?;
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// File name a recorded snapshot is stored under, keyed by block time.
#[must_use]
pub fn replay_file_name(snapshot: &InputSnapshot) -> String {
    format!(
        "snapshot-{}.json",
        snapshot.observed_at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Writes `snapshot` into `dir`, creating the directory if needed, and
/// returns the path written.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn write_replay(dir: impl AsRef<Path>, snapshot: &InputSnapshot) -> Result<PathBuf> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating replay directory {}", dir.display()))?;

    let path = dir.join(replay_file_name(snapshot));
    let json = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("writing replay file {}", path.display()))?;

    tracing::info!(path = %path.display(), "Recorded snapshot");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basket_hedge_core::{Constituent, HedgeAsset};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn snapshot() -> InputSnapshot {
        InputSnapshot {
            observed_at: Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 30).unwrap(),
            basket_unit_price_usd: 0.93,
            basket_units_held: 42_000.0,
            risk_asset_prices_usd: BTreeMap::from([
                (HedgeAsset::Eth, 3_350.5),
                (HedgeAsset::Btc, 61_200.0),
            ]),
            basket_composition: BTreeMap::from([
                (Constituent::Eth, 310.0),
                (Constituent::Wbtc, 240.0),
                (Constituent::Usdc, 450.0),
            ]),
            total_basket_composition: 1_000.0,
        }
    }

    #[tokio::test]
    async fn recorded_snapshot_replays_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_replay(dir.path().join("records"), &snapshot())
            .await
            .unwrap();

        assert!(path.ends_with("snapshot-20240229T235930Z.json"));
        let replayed = ReplaySource::new(&path).fetch().await.unwrap();
        assert_eq!(replayed, snapshot());
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let source = ReplaySource::new("/nonexistent/snapshot.json");
        let err = source.fetch().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/snapshot.json"));
    }

    #[tokio::test]
    async fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"observed_at": "yesterday"}"#).unwrap();

        assert!(ReplaySource::new(path).fetch().await.is_err());
    }

    #[tokio::test]
    async fn recording_overwrites_same_block() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_replay(dir.path(), &snapshot()).await.unwrap();

        let mut later = snapshot();
        later.basket_units_held = 43_000.0;
        let second = write_replay(dir.path(), &later).await.unwrap();

        assert_eq!(first, second);
        let replayed = ReplaySource::new(&second).fetch().await.unwrap();
        assert_eq!(replayed.basket_units_held, 43_000.0);
    }
}
