use crate::config::HedgeConfig;
use crate::decision::{check_current_shorts, HedgeLeg};
use crate::error::SanityFailure;
use crate::exposure::{compose_exposure, ExposureWeights};
use crate::gate::{run_sanity_gate, GateInput};
use crate::snapshot::{CurrentShorts, HedgeAsset, InputSnapshot};
use crate::valuation::{check_position_inputs, value_position};
use crate::weights::compute_weights;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of one evaluation. Built once, reported, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub observed_at: DateTime<Utc>,
    pub evaluated_at: DateTime<Utc>,
    pub basket_unit_price_usd: f64,
    pub units_valued: f64,
    pub held_value_usd: f64,
    pub exposure: ExposureWeights,
    pub legs: BTreeMap<HedgeAsset, HedgeLeg>,
}

impl DecisionRecord {
    #[must_use]
    pub fn leg(&self, asset: HedgeAsset) -> Option<&HedgeLeg> {
        self.legs.get(&asset)
    }

    #[must_use]
    pub fn intended_short_usd(&self, asset: HedgeAsset) -> Option<f64> {
        self.leg(asset).map(|leg| leg.intended_short_usd)
    }

    #[must_use]
    pub fn rebalance_needed(&self, asset: HedgeAsset) -> bool {
        self.leg(asset).is_some_and(|leg| leg.rebalance)
    }

    #[must_use]
    pub fn any_rebalance(&self) -> bool {
        self.legs.values().any(|leg| leg.rebalance)
    }
}

/// Evaluates `snapshot` against the wall clock.
///
/// # Errors
///
/// Returns the first sanity failure; no partial record is produced.
pub fn evaluate(
    snapshot: &InputSnapshot,
    current_shorts: &CurrentShorts,
    config: &HedgeConfig,
) -> Result<DecisionRecord, SanityFailure> {
    evaluate_at(snapshot, current_shorts, config, Utc::now())
}

/// Evaluates `snapshot` as of `now`.
///
/// Pure: identical inputs give an identical record.
///
/// # Errors
///
/// Returns the first sanity failure; no partial record is produced.
pub fn evaluate_at(
    snapshot: &InputSnapshot,
    current_shorts: &CurrentShorts,
    config: &HedgeConfig,
    now: DateTime<Utc>,
) -> Result<DecisionRecord, SanityFailure> {
    let weights = compute_weights(
        &snapshot.basket_composition,
        snapshot.total_basket_composition,
    )?;
    check_position_inputs(snapshot)?;
    check_current_shorts(current_shorts)?;

    let exposure = compose_exposure(&weights, &config.exposure_table());
    let valuation = value_position(snapshot, &exposure, config.override_units_held);

    tracing::debug!(
        held_value_usd = valuation.held_value_usd,
        ?exposure,
        "Derived exposure"
    );

    run_sanity_gate(&GateInput {
        snapshot,
        exposure: &exposure,
        valuation: &valuation,
        config,
        now,
    })?;

    let mut legs = BTreeMap::new();
    for (asset, short_usd) in &valuation.intended_short_usd {
        let Some(price_usd) = snapshot.price_usd(*asset) else {
            continue;
        };
        legs.insert(
            *asset,
            HedgeLeg::new(
                *asset,
                price_usd,
                *short_usd,
                current_shorts.get(*asset),
                config.rebalance_band,
            ),
        );
    }

    let record = DecisionRecord {
        observed_at: snapshot.observed_at,
        evaluated_at: now,
        basket_unit_price_usd: snapshot.basket_unit_price_usd,
        units_valued: valuation.units_valued,
        held_value_usd: valuation.held_value_usd,
        exposure,
        legs,
    };

    tracing::info!(
        held_value_usd = record.held_value_usd,
        rebalance = record.any_rebalance(),
        "Hedge evaluation complete"
    );

    Ok(record)
}
