use basket_hedge_core::{
    compose_exposure, compute_weights, evaluate_at, AssetClass, Bucket, Check, Constituent,
    CurrentShorts, FailureKind, HedgeAsset, HedgeConfig, InputSnapshot, SanityFailure,
    WeightRange,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 9, 30, 0).unwrap()
}

fn balanced_snapshot(observed_at: DateTime<Utc>) -> InputSnapshot {
    InputSnapshot {
        observed_at,
        basket_unit_price_usd: 1.0,
        basket_units_held: 500_000.0,
        risk_asset_prices_usd: BTreeMap::from([
            (HedgeAsset::Eth, 3_000.0),
            (HedgeAsset::Btc, 60_000.0),
        ]),
        basket_composition: BTreeMap::from([
            (Constituent::Eth, 400.0),
            (Constituent::Wbtc, 200.0),
            (Constituent::Usdc, 250.0),
            (Constituent::Dai, 150.0),
        ]),
        total_basket_composition: 1000.0,
    }
}

fn config() -> HedgeConfig {
    HedgeConfig {
        max_held_value_usd: 900_000.0,
        coefficients: BTreeMap::from([(AssetClass::LinkAndUni, 0.0)]),
        ..HedgeConfig::default()
    }
}

#[test]
fn balanced_basket_maps_to_buckets() {
    let snapshot = balanced_snapshot(now());
    let weights =
        compute_weights(&snapshot.basket_composition, snapshot.total_basket_composition).unwrap();

    assert!((weights.get(AssetClass::Eth) - 0.4).abs() < 1e-12);
    assert!((weights.get(AssetClass::Wbtc) - 0.2).abs() < 1e-12);
    assert!((weights.get(AssetClass::Stables) - 0.4).abs() < 1e-12);

    let exposure = compose_exposure(&weights, &config().exposure_table());
    assert!((exposure.get(Bucket::Eth).unwrap() - 0.4).abs() < 1e-12);
    assert!((exposure.get(Bucket::Wbtc).unwrap() - 0.2).abs() < 1e-12);
}

#[test]
fn wbtc_outside_its_range_is_named() {
    let mut config = config();
    config
        .weight_ranges
        .set(Bucket::Wbtc, Some(WeightRange::new(0.25, 0.35)));

    let err = evaluate_at(&balanced_snapshot(now()), &CurrentShorts::new(), &config, now())
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::RangeViolation);
    assert_eq!(err.check(), Check::BucketWeightRange);
    assert_eq!(err.quantity(), "wbtc_weight");
}

#[test]
fn held_value_above_ceiling_produces_no_record() {
    let snapshot = InputSnapshot {
        basket_units_held: 1_000_000.0,
        ..balanced_snapshot(now())
    };

    let err = evaluate_at(&snapshot, &CurrentShorts::new(), &config(), now()).unwrap_err();

    assert!(matches!(
        err,
        SanityFailure::RangeViolation {
            check: Check::ValuationCeiling,
            ..
        }
    ));
}

#[test]
fn evaluation_is_idempotent() {
    let snapshot = balanced_snapshot(now() - Duration::seconds(10));
    let shorts = CurrentShorts::new()
        .with(HedgeAsset::Eth, 60.0)
        .with(HedgeAsset::Btc, 1.0);

    let first = evaluate_at(&snapshot, &shorts, &config(), now()).unwrap();
    let second = evaluate_at(&snapshot, &shorts, &config(), now()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn freshness_boundary_is_millisecond_exact() {
    let at_limit = balanced_snapshot(now() - Duration::seconds(120));
    assert!(evaluate_at(&at_limit, &CurrentShorts::new(), &config(), now()).is_ok());

    let past_limit = balanced_snapshot(now() - Duration::milliseconds(120_001));
    let err = evaluate_at(&past_limit, &CurrentShorts::new(), &config(), now()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::StaleSnapshot);
}

#[test]
fn matching_held_shorts_do_not_rebalance() {
    // 0.4 * 500_000 / 3_000 ETH and 0.2 * 500_000 / 60_000 BTC.
    let shorts = CurrentShorts::new()
        .with(HedgeAsset::Eth, 200_000.0 / 3_000.0)
        .with(HedgeAsset::Btc, 100_000.0 / 60_000.0);

    let record = evaluate_at(&balanced_snapshot(now()), &shorts, &config(), now()).unwrap();

    assert!(!record.any_rebalance());
    assert!((record.intended_short_usd(HedgeAsset::Eth).unwrap() - 200_000.0).abs() < 1e-6);
    assert!((record.intended_short_usd(HedgeAsset::Btc).unwrap() - 100_000.0).abs() < 1e-6);
}

#[test]
fn single_hedge_needs_the_wider_eth_range() {
    let snapshot = balanced_snapshot(now());
    let mut config = HedgeConfig {
        variant: basket_hedge_core::BasketVariant::SingleHedge,
        ..config()
    };

    // 0.4 + 0.2 * 0.98 = 0.596 is above the default eth maximum of 0.45.
    let err = evaluate_at(&snapshot, &CurrentShorts::new(), &config, now()).unwrap_err();
    assert_eq!(err.quantity(), "eth_weight");

    config
        .weight_ranges
        .set(Bucket::Eth, Some(WeightRange::new(0.45, 0.70)));
    assert!(config.validate().is_ok());
    let record = evaluate_at(&snapshot, &CurrentShorts::new(), &config, now()).unwrap();
    assert!(record.leg(HedgeAsset::Btc).is_none());
    assert!((record.intended_short_usd(HedgeAsset::Eth).unwrap() - 298_000.0).abs() < 1e-6);
}

#[test]
fn negative_units_held_is_a_precondition_not_a_range_violation() {
    let mut snapshot = balanced_snapshot(now());
    snapshot.basket_units_held = -100_000.0;

    let err = evaluate_at(&snapshot, &CurrentShorts::new(), &config(), now()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Precondition);
    assert_eq!(err.check(), Check::PositionInput);
}
