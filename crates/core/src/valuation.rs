//! USD valuation of the held basket position and the shorts it implies.

use crate::error::{Bound, Check, SanityFailure};
use crate::exposure::ExposureWeights;
use crate::snapshot::{HedgeAsset, InputSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionValuation {
    /// Units the valuation used, after any override.
    pub units_valued: f64,
    pub held_value_usd: f64,
    /// Short size per hedged asset, in USD.
    pub intended_short_usd: BTreeMap<HedgeAsset, f64>,
}

impl PositionValuation {
    #[must_use]
    pub fn intended_short_usd(&self, asset: HedgeAsset) -> Option<f64> {
        self.intended_short_usd.get(&asset).copied()
    }
}

/// Unit price and units held must both be finite and non-negative.
///
/// # Errors
///
/// Returns a precondition failure naming the first bad field.
pub fn check_position_inputs(snapshot: &InputSnapshot) -> Result<(), SanityFailure> {
    for (quantity, value) in [
        ("basket_unit_price_usd", snapshot.basket_unit_price_usd),
        ("basket_units_held", snapshot.basket_units_held),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(SanityFailure::precondition(
                Check::PositionInput,
                quantity,
                value,
                Bound::NonNegative,
            ));
        }
    }
    Ok(())
}

/// Values the held position and sizes one short per risk bucket.
///
/// `override_units` replaces the measured units held when set.
#[must_use]
pub fn value_position(
    snapshot: &InputSnapshot,
    exposure: &ExposureWeights,
    override_units: Option<f64>,
) -> PositionValuation {
    let units_valued = match override_units {
        Some(units) => {
            tracing::warn!(
                measured_units = snapshot.basket_units_held,
                override_units = units,
                "Valuing position with overridden units held"
            );
            units
        }
        None => snapshot.basket_units_held,
    };

    let held_value_usd = snapshot.basket_unit_price_usd * units_valued;
    let intended_short_usd = exposure
        .risk_buckets()
        .map(|(asset, _, weight)| (asset, weight * held_value_usd))
        .collect();

    PositionValuation {
        units_valued,
        held_value_usd,
        intended_short_usd,
    }
}
