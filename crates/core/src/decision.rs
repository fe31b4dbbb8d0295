//! Per-asset rebalance trigger.

use crate::error::{Bound, Check, SanityFailure};
use crate::snapshot::{CurrentShorts, HedgeAsset};
use serde::{Deserialize, Serialize};

/// Intended versus held short for one hedged asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeLeg {
    pub asset: HedgeAsset,
    pub price_usd: f64,
    pub intended_short_usd: f64,
    pub intended_short_native: f64,
    pub current_short_native: f64,
    pub rebalance: bool,
}

impl HedgeLeg {
    /// Builds the leg for `asset`. The price must already have passed the
    /// gate's price check.
    #[must_use]
    pub fn new(
        asset: HedgeAsset,
        price_usd: f64,
        intended_short_usd: f64,
        current_short_native: f64,
        band: f64,
    ) -> Self {
        let intended_short_native = intended_short_usd / price_usd;
        let rebalance = needs_rebalance(intended_short_native, current_short_native, band);

        tracing::debug!(
            asset = %asset,
            intended_short_native,
            current_short_native,
            rebalance,
            "Evaluated hedge leg"
        );

        Self {
            asset,
            price_usd,
            intended_short_usd,
            intended_short_native,
            current_short_native,
            rebalance,
        }
    }

    /// Held short valued at the snapshot price.
    #[must_use]
    pub fn current_short_usd(&self) -> f64 {
        self.current_short_native * self.price_usd
    }
}

/// True when `intended` lies strictly outside
/// `[current * (1 - band), current * (1 + band)]`.
///
/// A zero held short has a zero-width band, so any positive intended short
/// triggers.
#[must_use]
pub fn needs_rebalance(intended: f64, current: f64, band: f64) -> bool {
    intended > current * (1.0 + band) || intended < current * (1.0 - band)
}

/// Held shorts must be finite and non-negative; a negative one would flip
/// the band.
///
/// # Errors
///
/// Returns a precondition failure naming the first bad short.
pub fn check_current_shorts(shorts: &CurrentShorts) -> Result<(), SanityFailure> {
    for (asset, size) in shorts.iter() {
        if !size.is_finite() || size < 0.0 {
            return Err(SanityFailure::precondition(
                Check::CurrentShort,
                format!("{asset}_current_short"),
                size,
                Bound::NonNegative,
            ));
        }
    }
    Ok(())
}
