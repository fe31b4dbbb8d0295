//! Sanity gate run before any rebalance decision is trusted.
//!
//! Checks run in a fixed order and the first failure aborts the
//! evaluation:
//!
//! 1. Freshness of the snapshot against the evaluation clock.
//! 2. Held value against the configured ceiling.
//! 3. Every bucket weight against its configured range.
//! 4. Every intended short against held value × bucket maximum.
//! 5. Every hedged asset price is present, finite and positive.
//!
//! The engine rejects negative or non-finite position inputs before the
//! gate runs. With a non-negative held value, check 4 cannot fail once
//! check 3 has passed, since the short is the bucket weight times the held
//! value. It stays as a cross-check on the valuation arithmetic.

use crate::config::{HedgeConfig, WeightRanges};
use crate::error::{Bound, Check, SanityFailure};
use crate::exposure::{Bucket, ExposureWeights};
use crate::snapshot::{HedgeAsset, InputSnapshot};
use crate::valuation::PositionValuation;
use chrono::{DateTime, Duration, Utc};

/// Everything the gate inspects for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub snapshot: &'a InputSnapshot,
    pub exposure: &'a ExposureWeights,
    pub valuation: &'a PositionValuation,
    pub config: &'a HedgeConfig,
    pub now: DateTime<Utc>,
}

/// Runs all checks in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the failure of the first check that did not pass.
pub fn run_sanity_gate(input: &GateInput<'_>) -> Result<(), SanityFailure> {
    let result = check_freshness(
        input.snapshot.observed_at,
        input.now,
        input.config.freshness_tolerance_ms,
    )
    .and_then(|()| {
        check_valuation_ceiling(
            input.valuation.held_value_usd,
            input.config.max_held_value_usd,
        )
    })
    .and_then(|()| check_bucket_weights(input.exposure, &input.config.weight_ranges))
    .and_then(|()| check_short_ceiling(input.valuation, &input.config.weight_ranges))
    .and_then(|()| check_prices(input.snapshot, input.valuation.intended_short_usd.keys()));

    if let Err(failure) = &result {
        tracing::warn!(
            check = %failure.check(),
            quantity = failure.quantity(),
            "Sanity gate rejected snapshot: {failure}"
        );
    }
    result
}

/// `|now - observed_at|` must not exceed the tolerance.
///
/// # Errors
///
/// Returns [`SanityFailure::StaleSnapshot`] when it does.
pub fn check_freshness(
    observed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    tolerance_ms: u64,
) -> Result<(), SanityFailure> {
    let skew = now - observed_at;
    let age = if skew < Duration::zero() { -skew } else { skew };
    let tolerance = Duration::milliseconds(i64::try_from(tolerance_ms).unwrap_or(i64::MAX));

    if age > tolerance {
        return Err(SanityFailure::StaleSnapshot {
            observed_at,
            now,
            age_ms: age.num_milliseconds(),
            tolerance_ms,
        });
    }
    Ok(())
}

/// Held value must be finite and at most `max_held_value_usd`.
///
/// # Errors
///
/// Returns a range violation otherwise.
pub fn check_valuation_ceiling(
    held_value_usd: f64,
    max_held_value_usd: f64,
) -> Result<(), SanityFailure> {
    if !held_value_usd.is_finite() || held_value_usd > max_held_value_usd {
        return Err(SanityFailure::range_violation(
            Check::ValuationCeiling,
            "held_value_usd",
            held_value_usd,
            Bound::AtMost(max_held_value_usd),
        ));
    }
    Ok(())
}

/// Every bucket weight must sit inside its configured range.
///
/// # Errors
///
/// Returns a range violation naming the bucket, or a precondition failure
/// when a bucket has no range configured.
pub fn check_bucket_weights(
    exposure: &ExposureWeights,
    ranges: &WeightRanges,
) -> Result<(), SanityFailure> {
    for (bucket, weight) in exposure.iter() {
        let quantity = format!("{bucket}_weight");
        let Some(range) = ranges.get(bucket) else {
            return Err(SanityFailure::precondition(
                Check::BucketWeightRange,
                quantity,
                weight,
                Bound::Configured,
            ));
        };
        if !range.contains(weight) {
            return Err(SanityFailure::range_violation(
                Check::BucketWeightRange,
                quantity,
                weight,
                Bound::Within {
                    min: range.min,
                    max: range.max,
                },
            ));
        }
    }
    Ok(())
}

/// No short may exceed held value × its bucket's maximum weight.
///
/// # Errors
///
/// Returns a range violation naming the asset.
pub fn check_short_ceiling(
    valuation: &PositionValuation,
    ranges: &WeightRanges,
) -> Result<(), SanityFailure> {
    for (asset, short_usd) in &valuation.intended_short_usd {
        let quantity = format!("{asset}_short_usd");
        let Some(range) = ranges.get(Bucket::for_hedge(*asset)) else {
            return Err(SanityFailure::precondition(
                Check::ShortCeiling,
                quantity,
                *short_usd,
                Bound::Configured,
            ));
        };
        let ceiling = valuation.held_value_usd * range.max;
        if !short_usd.is_finite() || *short_usd > ceiling {
            return Err(SanityFailure::range_violation(
                Check::ShortCeiling,
                quantity,
                *short_usd,
                Bound::AtMost(ceiling),
            ));
        }
    }
    Ok(())
}

/// Each required price must be present, finite and positive.
///
/// # Errors
///
/// Returns a precondition failure naming the first bad price.
pub fn check_prices<'a>(
    snapshot: &InputSnapshot,
    required: impl IntoIterator<Item = &'a HedgeAsset>,
) -> Result<(), SanityFailure> {
    for asset in required {
        let price = snapshot.price_usd(*asset).unwrap_or(f64::NAN);
        if !price.is_finite() || price <= 0.0 {
            return Err(SanityFailure::precondition(
                Check::PriceValidity,
                format!("{asset}_price_usd"),
                price,
                Bound::Positive,
            ));
        }
    }
    Ok(())
}
