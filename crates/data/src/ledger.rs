use anyhow::Result;
use async_trait::async_trait;
use basket_hedge_core::{Constituent, HedgeAsset};
use chrono::{DateTime, Utc};

/// Single-value reads the snapshot is assembled from.
///
/// Every method returns a value already scaled to human units (USD, basket
/// units, composition units). A read either succeeds or errors; there are
/// no default values.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Timestamp of the block the basket reads are taken at.
    async fn latest_block_time(&self) -> Result<DateTime<Utc>>;

    async fn basket_units_held(&self) -> Result<f64>;

    async fn basket_unit_price_usd(&self) -> Result<f64>;

    async fn oracle_price_usd(&self, asset: HedgeAsset) -> Result<f64>;

    async fn composition_total(&self) -> Result<f64>;

    async fn composition_amount(&self, constituent: Constituent) -> Result<f64>;
}
