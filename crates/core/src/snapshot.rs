//! Input snapshot handed to the engine by a data collaborator.
//!
//! A snapshot is a flat bundle of numbers read at one point in time. It
//! carries no logic beyond lookups; every derived quantity is computed by
//! the engine from a fresh snapshot on each run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A token backing the basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constituent {
    Eth,
    Wbtc,
    Usdc,
    Usdt,
    Dai,
    Link,
    Uni,
    Frax,
}

impl Constituent {
    /// Every constituent of the default basket, in read order.
    pub const ALL: [Constituent; 8] = [
        Self::Eth,
        Self::Wbtc,
        Self::Usdc,
        Self::Usdt,
        Self::Dai,
        Self::Link,
        Self::Uni,
        Self::Frax,
    ];

    /// Asset class this constituent is weighted under.
    #[must_use]
    pub const fn class(self) -> AssetClass {
        match self {
            Self::Eth => AssetClass::Eth,
            Self::Wbtc => AssetClass::Wbtc,
            Self::Link | Self::Uni => AssetClass::LinkAndUni,
            Self::Usdc | Self::Usdt | Self::Dai | Self::Frax => AssetClass::Stables,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Wbtc => "wbtc",
            Self::Usdc => "usdc",
            Self::Usdt => "usdt",
            Self::Dai => "dai",
            Self::Link => "link",
            Self::Uni => "uni",
            Self::Frax => "frax",
        }
    }
}

impl fmt::Display for Constituent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping of constituents that share one weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Primary risk asset.
    Eth,
    /// Secondary risk asset.
    Wbtc,
    /// Assets correlated with ETH but not hedged on their own.
    LinkAndUni,
    Stables,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [Self::Eth, Self::Wbtc, Self::LinkAndUni, Self::Stables];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Wbtc => "wbtc",
            Self::LinkAndUni => "link_and_uni",
            Self::Stables => "stables",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asset held short as a hedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HedgeAsset {
    Eth,
    Btc,
}

impl HedgeAsset {
    pub const ALL: [HedgeAsset; 2] = [Self::Eth, Self::Btc];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Btc => "btc",
        }
    }

    /// Ticker used in reports.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eth => "ETH",
            Self::Btc => "BTC",
        }
    }
}

impl fmt::Display for HedgeAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally supplied facts for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Timestamp of the ledger block the values were read at.
    pub observed_at: DateTime<Utc>,
    pub basket_unit_price_usd: f64,
    pub basket_units_held: f64,
    pub risk_asset_prices_usd: BTreeMap<HedgeAsset, f64>,
    /// Per-constituent amount backing the basket supply.
    pub basket_composition: BTreeMap<Constituent, f64>,
    /// Treated as the sum of all composition entries.
    pub total_basket_composition: f64,
}

impl InputSnapshot {
    /// Price of a hedged asset, if the snapshot carries one.
    #[must_use]
    pub fn price_usd(&self, asset: HedgeAsset) -> Option<f64> {
        self.risk_asset_prices_usd.get(&asset).copied()
    }

    /// Composition amount of a constituent; absent constituents count as zero.
    #[must_use]
    pub fn composition(&self, constituent: Constituent) -> f64 {
        self.basket_composition
            .get(&constituent)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Hedge currently held per asset, in native units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentShorts(BTreeMap<HedgeAsset, f64>);

impl CurrentShorts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, asset: HedgeAsset, size_native: f64) -> Self {
        self.0.insert(asset, size_native);
        self
    }

    /// Held short for `asset`; an asset with no recorded short holds zero.
    #[must_use]
    pub fn get(&self, asset: HedgeAsset) -> f64 {
        self.0.get(&asset).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HedgeAsset, f64)> + '_ {
        self.0.iter().map(|(asset, size)| (*asset, *size))
    }
}

impl FromIterator<(HedgeAsset, f64)> for CurrentShorts {
    fn from_iter<T: IntoIterator<Item = (HedgeAsset, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
