use crate::ledger::LedgerReader;
use anyhow::{Context, Result};
use async_trait::async_trait;
use basket_hedge_core::{Constituent, HedgeAsset, InputSnapshot, SnapshotSource};
use futures_util::future::try_join_all;

/// Issues every read concurrently and assembles one snapshot.
///
/// The first failed read aborts the whole gather; no partial snapshot is
/// returned.
///
/// # Errors
///
/// Returns the first read error, annotated with the value being read.
pub async fn gather_snapshot<R>(reader: &R, constituents: &[Constituent]) -> Result<InputSnapshot>
where
    R: LedgerReader + ?Sized,
{
    let prices = try_join_all(HedgeAsset::ALL.into_iter().map(|asset| async move {
        let price = reader
            .oracle_price_usd(asset)
            .await
            .with_context(|| format!("reading {asset} oracle price"))?;
        Ok::<_, anyhow::Error>((asset, price))
    }));

    let composition = try_join_all(constituents.iter().map(|constituent| async move {
        let amount = reader
            .composition_amount(*constituent)
            .await
            .with_context(|| format!("reading {constituent} composition"))?;
        Ok::<_, anyhow::Error>((*constituent, amount))
    }));

    let (observed_at, units_held, unit_price, total, prices, composition) = tokio::try_join!(
        async {
            reader
                .latest_block_time()
                .await
                .context("reading latest block time")
        },
        async {
            reader
                .basket_units_held()
                .await
                .context("reading basket units held")
        },
        async {
            reader
                .basket_unit_price_usd()
                .await
                .context("reading basket unit price")
        },
        async {
            reader
                .composition_total()
                .await
                .context("reading composition total")
        },
        prices,
        composition,
    )?;

    let snapshot = InputSnapshot {
        observed_at,
        basket_unit_price_usd: unit_price,
        basket_units_held: units_held,
        risk_asset_prices_usd: prices.into_iter().collect(),
        basket_composition: composition.into_iter().collect(),
        total_basket_composition: total,
    };

    tracing::debug!(
        observed_at = %snapshot.observed_at,
        units_held = snapshot.basket_units_held,
        total = snapshot.total_basket_composition,
        "Gathered snapshot"
    );

    Ok(snapshot)
}

/// A [`SnapshotSource`] that reads the live ledger on every fetch.
pub struct LedgerSnapshotSource<R> {
    reader: R,
    constituents: Vec<Constituent>,
}

impl<R: LedgerReader> LedgerSnapshotSource<R> {
    /// Reads every constituent of the default basket.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            constituents: Constituent::ALL.to_vec(),
        }
    }

    #[must_use]
    pub fn with_constituents(mut self, constituents: Vec<Constituent>) -> Self {
        self.constituents = constituents;
        self
    }
}

#[async_trait]
impl<R: LedgerReader> SnapshotSource for LedgerSnapshotSource<R> {
    async fn fetch(&self) -> Result<InputSnapshot> {
        gather_snapshot(&self.reader, &self.constituents).await
    }

    fn name(&self) -> &str {
        "ledger"
    }
}
