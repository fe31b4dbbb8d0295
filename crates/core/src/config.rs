use crate::error::ConfigError;
use crate::exposure::{BasketVariant, Bucket, ExposureTable};
use crate::snapshot::{AssetClass, Constituent, CurrentShorts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default tolerance between the snapshot block time and the evaluation clock.
pub const DEFAULT_FRESHNESS_TOLERANCE_MS: u64 = 120_000;
/// Default half-width of the no-rebalance band around the held short.
pub const DEFAULT_REBALANCE_BAND: f64 = 0.10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hedge: HedgeConfig,
    pub chain: ChainConfig,
    /// Hedge currently held, in native units per asset.
    pub shorts: CurrentShorts,
}

impl AppConfig {
    /// Validates the hedge settings and the held shorts.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hedge.validate()?;
        for (asset, size) in self.shorts.iter() {
            if !size.is_finite() || size < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("shorts.{asset}"),
                    value: size,
                    reason: "must be a finite non-negative number",
                });
            }
        }
        Ok(())
    }
}

/// Inclusive `[min, max]` band for a bucket weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
}

impl WeightRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, weight: f64) -> bool {
        weight >= self.min && weight <= self.max
    }
}

/// Acceptable weight band per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightRanges {
    pub eth: Option<WeightRange>,
    pub wbtc: Option<WeightRange>,
    pub stables: Option<WeightRange>,
}

impl Default for WeightRanges {
    fn default() -> Self {
        Self {
            eth: Some(WeightRange::new(0.19, 0.45)),
            wbtc: Some(WeightRange::new(0.15, 0.35)),
            stables: Some(WeightRange::new(0.35, 0.65)),
        }
    }
}

impl WeightRanges {
    #[must_use]
    pub const fn get(&self, bucket: Bucket) -> Option<WeightRange> {
        match bucket {
            Bucket::Eth => self.eth,
            Bucket::Wbtc => self.wbtc,
            Bucket::Stables => self.stables,
        }
    }

    pub fn set(&mut self, bucket: Bucket, range: Option<WeightRange>) {
        match bucket {
            Bucket::Eth => self.eth = range,
            Bucket::Wbtc => self.wbtc = range,
            Bucket::Stables => self.stables = range,
        }
    }

    /// Configured ranges in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, WeightRange)> + '_ {
        Bucket::ALL
            .into_iter()
            .filter_map(|bucket| self.get(bucket).map(|range| (bucket, range)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgeConfig {
    /// Ceiling on the USD value of the held basket position.
    pub max_held_value_usd: f64,
    pub weight_ranges: WeightRanges,
    pub variant: BasketVariant,
    /// Coefficient overrides applied on top of the variant's table.
    pub coefficients: BTreeMap<AssetClass, f64>,
    pub rebalance_band: f64,
    pub freshness_tolerance_ms: u64,
    /// Replaces the measured units held before valuation. Testing only.
    pub override_units_held: Option<f64>,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            // Unset ceiling rejects every position until configured.
            max_held_value_usd: 0.0,
            weight_ranges: WeightRanges::default(),
            variant: BasketVariant::default(),
            coefficients: BTreeMap::new(),
            rebalance_band: DEFAULT_REBALANCE_BAND,
            freshness_tolerance_ms: DEFAULT_FRESHNESS_TOLERANCE_MS,
            override_units_held: None,
        }
    }
}

impl HedgeConfig {
    /// The variant's table with any coefficient overrides applied.
    #[must_use]
    pub fn exposure_table(&self) -> ExposureTable {
        self.coefficients
            .iter()
            .fold(self.variant.table(), |table, (class, coefficient)| {
                table.with_coefficient(*class, *coefficient)
            })
    }

    #[must_use]
    pub fn weight_range(&self, bucket: Bucket) -> Option<WeightRange> {
        self.weight_ranges.get(bucket)
    }

    /// Rejects configurations the gate could not apply consistently.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_held_value_usd.is_finite() || self.max_held_value_usd < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "max_held_value_usd".to_string(),
                value: self.max_held_value_usd,
                reason: "must be a finite non-negative number",
            });
        }

        if !self.rebalance_band.is_finite() || !(0.0..1.0).contains(&self.rebalance_band) {
            return Err(ConfigError::InvalidValue {
                field: "rebalance_band".to_string(),
                value: self.rebalance_band,
                reason: "must lie in [0, 1)",
            });
        }

        if self.freshness_tolerance_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "freshness_tolerance_ms".to_string(),
                value: 0.0,
                reason: "must be greater than zero",
            });
        }

        if let Some(units) = self.override_units_held {
            if !units.is_finite() || units < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "override_units_held".to_string(),
                    value: units,
                    reason: "must be a finite non-negative number",
                });
            }
        }

        for (bucket, range) in self.weight_ranges.iter() {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: format!("weight_ranges.{bucket}"),
                    value: if range.min.is_finite() { range.max } else { range.min },
                    reason: "bounds must be finite",
                });
            }
            if range.min > range.max {
                return Err(ConfigError::InvertedRange {
                    bucket: bucket.to_string(),
                    min: range.min,
                    max: range.max,
                });
            }
        }

        let table = self.exposure_table();
        for rule in &table.rules {
            if !rule.coefficient.is_finite() || rule.coefficient < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("coefficients.{}", rule.class),
                    value: rule.coefficient,
                    reason: "must be a finite non-negative number",
                });
            }
        }

        let buckets = table.buckets();
        if !buckets.contains(&Bucket::Stables) {
            return Err(ConfigError::MissingStablesRule);
        }
        for bucket in buckets {
            if self.weight_ranges.get(bucket).is_none() {
                return Err(ConfigError::MissingRange {
                    bucket: bucket.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Where the snapshot is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the chain the basket lives on.
    pub basket_rpc_url: String,
    /// JSON-RPC endpoint of the chain hosting the price oracles.
    pub oracle_rpc_url: String,
    /// Account whose basket balance is hedged.
    pub owner_address: String,
    pub contracts: ContractAddresses,
    /// Token address per constituent, used to query the vault.
    pub tokens: BTreeMap<Constituent, String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            basket_rpc_url: String::new(),
            oracle_rpc_url: String::new(),
            owner_address: String::new(),
            contracts: ContractAddresses::default(),
            tokens: BTreeMap::from([
                (Constituent::Eth, "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1".to_string()),
                (Constituent::Wbtc, "0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f".to_string()),
                (Constituent::Usdc, "0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8".to_string()),
                (Constituent::Usdt, "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9".to_string()),
                (Constituent::Dai, "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1".to_string()),
                (Constituent::Link, "0xf97f4df75117a78c1A5a0DBb814Af92458539FB4".to_string()),
                (Constituent::Uni, "0xFa7F8980b0f1E64A2062791cc3b0871572f1F7f0".to_string()),
                (Constituent::Frax, "0x17FC002b466eEc40DaE837Fc4bE5c67993ddBd6F".to_string()),
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    /// Staked basket token; `balanceOf(owner)` gives units held.
    pub staked_basket: String,
    /// Basket manager; `getPrice(true)` gives the unit price.
    pub basket_manager: String,
    /// Vault; `usdgAmounts(token)` gives per-constituent composition.
    pub vault: String,
    /// Composition accounting token; `totalSupply()` gives the total.
    pub usdg: String,
    pub eth_usd_oracle: String,
    pub btc_usd_oracle: String,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            staked_basket: "0x1aDDD80E6039594eE970E5872D247bf0414C8903".to_string(),
            basket_manager: "0x3963FfC9dff443c2A94f21b129D429891E32ec18".to_string(),
            vault: "0x489ee077994B6658eAfA855C308275EAd8097C4A".to_string(),
            usdg: "0x45096e7aA921f27590f8F19e457794EB09678141".to_string(),
            eth_usd_oracle: "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419".to_string(),
            btc_usd_oracle: "0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c".to_string(),
        }
    }
}
