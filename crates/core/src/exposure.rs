//! Folding asset-class weights into hedge buckets.
//!
//! Correlated constituents are not hedged individually. Each one is folded
//! into a dominant bucket scaled by a coefficient approximating its
//! co-movement with that bucket's asset. The folding is described by a
//! declarative [`ExposureTable`], so both basket variants share one
//! composer.

use crate::snapshot::{AssetClass, HedgeAsset};
use crate::weights::AssetWeights;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// LINK and UNI move roughly 1.2x ETH.
pub const LINK_AND_UNI_ETH_COEFFICIENT: f64 = 1.2;
/// WBTC folded into the ETH hedge.
pub const WBTC_ETH_COEFFICIENT: f64 = 0.98;

/// Exposure bucket a class weight lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Hedged with an ETH short.
    Eth,
    /// Hedged with a BTC short.
    Wbtc,
    /// Not hedged.
    Stables,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Self::Eth, Self::Wbtc, Self::Stables];

    /// Asset shorted against this bucket, `None` for stables.
    #[must_use]
    pub const fn hedge_asset(self) -> Option<HedgeAsset> {
        match self {
            Self::Eth => Some(HedgeAsset::Eth),
            Self::Wbtc => Some(HedgeAsset::Btc),
            Self::Stables => None,
        }
    }

    /// Bucket hedged by `asset`.
    #[must_use]
    pub const fn for_hedge(asset: HedgeAsset) -> Self {
        match asset {
            HedgeAsset::Eth => Self::Eth,
            HedgeAsset::Btc => Self::Wbtc,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Wbtc => "wbtc",
            Self::Stables => "stables",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes one asset class into a bucket with a scaling coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldRule {
    pub class: AssetClass,
    pub bucket: Bucket,
    pub coefficient: f64,
}

impl FoldRule {
    #[must_use]
    pub const fn new(class: AssetClass, bucket: Bucket, coefficient: f64) -> Self {
        Self {
            class,
            bucket,
            coefficient,
        }
    }
}

/// Preset tables for the supported basket deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BasketVariant {
    /// Separate ETH and BTC hedges.
    #[default]
    TwoHedge,
    /// One ETH hedge with WBTC folded in.
    SingleHedge,
}

impl BasketVariant {
    #[must_use]
    pub fn table(self) -> ExposureTable {
        match self {
            Self::TwoHedge => ExposureTable::two_hedge(),
            Self::SingleHedge => ExposureTable::single_hedge(),
        }
    }
}

impl std::str::FromStr for BasketVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-hedge" => Ok(Self::TwoHedge),
            "single-hedge" => Ok(Self::SingleHedge),
            other => Err(format!(
                "unknown basket variant '{other}' (expected two-hedge or single-hedge)"
            )),
        }
    }
}

/// Declarative class → bucket → coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureTable {
    pub rules: Vec<FoldRule>,
}

impl Default for ExposureTable {
    fn default() -> Self {
        Self::two_hedge()
    }
}

impl ExposureTable {
    #[must_use]
    pub fn new(rules: Vec<FoldRule>) -> Self {
        Self { rules }
    }

    /// ETH bucket = eth + 1.2 × (link + uni); WBTC bucket = wbtc.
    #[must_use]
    pub fn two_hedge() -> Self {
        Self::new(vec![
            FoldRule::new(AssetClass::Eth, Bucket::Eth, 1.0),
            FoldRule::new(
                AssetClass::LinkAndUni,
                Bucket::Eth,
                LINK_AND_UNI_ETH_COEFFICIENT,
            ),
            FoldRule::new(AssetClass::Wbtc, Bucket::Wbtc, 1.0),
            FoldRule::new(AssetClass::Stables, Bucket::Stables, 1.0),
        ])
    }

    /// ETH bucket = eth + 1.2 × (link + uni) + 0.98 × wbtc.
    #[must_use]
    pub fn single_hedge() -> Self {
        Self::new(vec![
            FoldRule::new(AssetClass::Eth, Bucket::Eth, 1.0),
            FoldRule::new(
                AssetClass::LinkAndUni,
                Bucket::Eth,
                LINK_AND_UNI_ETH_COEFFICIENT,
            ),
            FoldRule::new(AssetClass::Wbtc, Bucket::Eth, WBTC_ETH_COEFFICIENT),
            FoldRule::new(AssetClass::Stables, Bucket::Stables, 1.0),
        ])
    }

    /// Replaces the coefficient of every rule for `class`.
    #[must_use]
    pub fn with_coefficient(mut self, class: AssetClass, coefficient: f64) -> Self {
        for rule in self.rules.iter_mut().filter(|rule| rule.class == class) {
            rule.coefficient = coefficient;
        }
        self
    }

    /// Buckets that receive weight under this table.
    #[must_use]
    pub fn buckets(&self) -> Vec<Bucket> {
        let mut buckets: Vec<Bucket> = self.rules.iter().map(|rule| rule.bucket).collect();
        buckets.sort();
        buckets.dedup();
        buckets
    }

    /// Assets that need a short under this table.
    #[must_use]
    pub fn hedged_assets(&self) -> Vec<HedgeAsset> {
        self.buckets()
            .into_iter()
            .filter_map(Bucket::hedge_asset)
            .collect()
    }
}

/// Net weight per bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureWeights(BTreeMap<Bucket, f64>);

impl ExposureWeights {
    /// Weight of `bucket`, `None` when the table routes nothing into it.
    #[must_use]
    pub fn get(&self, bucket: Bucket) -> Option<f64> {
        self.0.get(&bucket).copied()
    }

    #[must_use]
    pub fn risk(&self, asset: HedgeAsset) -> Option<f64> {
        self.get(Bucket::for_hedge(asset))
    }

    #[must_use]
    pub fn stables(&self) -> f64 {
        self.get(Bucket::Stables).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, f64)> + '_ {
        self.0.iter().map(|(bucket, weight)| (*bucket, *weight))
    }

    /// Risk buckets with their hedge asset, in bucket order.
    pub fn risk_buckets(&self) -> impl Iterator<Item = (HedgeAsset, Bucket, f64)> + '_ {
        self.iter()
            .filter_map(|(bucket, weight)| bucket.hedge_asset().map(|asset| (asset, bucket, weight)))
    }
}

/// Applies `table` to `weights`.
#[must_use]
pub fn compose_exposure(weights: &AssetWeights, table: &ExposureTable) -> ExposureWeights {
    let mut buckets: BTreeMap<Bucket, f64> = BTreeMap::new();
    for rule in &table.rules {
        *buckets.entry(rule.bucket).or_insert(0.0) += weights.get(rule.class) * rule.coefficient;
    }
    ExposureWeights(buckets)
}
