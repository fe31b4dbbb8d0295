use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Unprefixed environment names used by existing deployment scripts,
/// mapped onto their config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("MAX_EXPECTED_GLP_OWNED_USD", "hedge.max_held_value_usd"),
    ("CURRENT_SHORT_SIZE_ETH", "shorts.eth"),
    ("CURRENT_SHORT_SIZE_BTC", "shorts.btc"),
    ("ADDRESS", "chain.owner_address"),
    ("MAINNET_RPC_URL", "chain.oracle_rpc_url"),
    ("ARBITRUM_RPC_URL", "chain.basket_rpc_url"),
];

/// Legacy units override, given in wei (18 decimals). Zero means unset.
const LEGACY_OVERRIDE_ENV: &str = "OVERRIDE_GLP_OWNED";
const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by merging a TOML file, a JSON sibling, legacy
    /// environment names and `APP_`-prefixed environment variables.
    ///
    /// Missing files are skipped; built-in defaults fill any gap.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed or fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        let mut figment = Figment::new()
            .merge(Toml::file(path))
            .join(Json::file(path.with_extension("json")))
            .merge(Self::legacy_env());
        if let Some(units) = Self::legacy_override_units()? {
            figment = figment.merge(Serialized::default("hedge.override_units_held", units));
        }
        let config: AppConfig = figment
            .merge(Env::prefixed("APP_").split("__"))
            .extract()?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn legacy_env() -> Env {
        let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
        Env::raw().only(&names).map(|key| {
            LEGACY_ENV
                .iter()
                .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                .map_or_else(|| key.into(), |(_, mapped)| (*mapped).into())
        })
    }

    fn legacy_override_units() -> Result<Option<f64>> {
        let Ok(raw) = std::env::var(LEGACY_OVERRIDE_ENV) else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let wei: u128 = raw
            .parse()
            .with_context(|| format!("{LEGACY_OVERRIDE_ENV} must be an integer amount in wei"))?;
        Ok(wei_to_units(wei))
    }
}

/// Converts a wei amount to whole units; zero maps to `None`.
#[allow(clippy::cast_precision_loss)]
fn wei_to_units(wei: u128) -> Option<f64> {
    if wei == 0 {
        return None;
    }
    let whole = (wei / WEI_PER_UNIT) as f64;
    let fraction = (wei % WEI_PER_UNIT) as f64 / WEI_PER_UNIT as f64;
    Some(whole + fraction)
}
