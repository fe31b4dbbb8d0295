//! Basket composition → per-class weights.

use crate::error::{Bound, Check, SanityFailure};
use crate::snapshot::{AssetClass, Constituent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fraction of the basket backed by each asset class.
///
/// Weights are not required to sum to one; a snapshot may cover only part
/// of the basket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetWeights(BTreeMap<AssetClass, f64>);

impl AssetWeights {
    /// Weight of `class`, zero when the snapshot held none of it.
    #[must_use]
    pub fn get(&self, class: AssetClass) -> f64 {
        self.0.get(&class).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        self.0.iter().map(|(class, weight)| (*class, *weight))
    }
}

impl FromIterator<(AssetClass, f64)> for AssetWeights {
    fn from_iter<T: IntoIterator<Item = (AssetClass, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Divides each class's composition amount by the basket total.
///
/// # Errors
///
/// Returns a precondition failure when the total is not a positive finite
/// number, when any amount is negative or non-finite, or when a class holds
/// more than the total.
pub fn compute_weights(
    composition: &BTreeMap<Constituent, f64>,
    total: f64,
) -> Result<AssetWeights, SanityFailure> {
    if !total.is_finite() || total <= 0.0 {
        return Err(SanityFailure::precondition(
            Check::CompositionTotal,
            "total_basket_composition",
            total,
            Bound::Positive,
        ));
    }

    let mut class_amounts: BTreeMap<AssetClass, f64> =
        AssetClass::ALL.iter().map(|class| (*class, 0.0)).collect();

    for (constituent, amount) in composition {
        if !amount.is_finite() || *amount < 0.0 {
            return Err(SanityFailure::precondition(
                Check::CompositionAmount,
                format!("{constituent}_composition"),
                *amount,
                Bound::NonNegative,
            ));
        }
        *class_amounts.entry(constituent.class()).or_insert(0.0) += amount;
    }

    let mut weights = BTreeMap::new();
    for (class, amount) in class_amounts {
        if amount > total {
            return Err(SanityFailure::precondition(
                Check::CompositionAmount,
                format!("{class}_composition"),
                amount,
                Bound::AtMost(total),
            ));
        }
        weights.insert(class, amount / total);
    }

    Ok(AssetWeights(weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn composition(entries: &[(Constituent, f64)]) -> BTreeMap<Constituent, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn divides_each_class_by_total() {
        let comp = composition(&[
            (Constituent::Eth, 400.0),
            (Constituent::Wbtc, 200.0),
            (Constituent::Usdc, 400.0),
        ]);
        let weights = compute_weights(&comp, 1000.0).unwrap();

        assert!((weights.get(AssetClass::Eth) - 0.4).abs() < 1e-12);
        assert!((weights.get(AssetClass::Wbtc) - 0.2).abs() < 1e-12);
        assert!((weights.get(AssetClass::Stables) - 0.4).abs() < 1e-12);
        assert_eq!(weights.get(AssetClass::LinkAndUni), 0.0);
    }

    #[test]
    fn stables_sum_every_stablecoin() {
        let comp = composition(&[
            (Constituent::Usdc, 100.0),
            (Constituent::Usdt, 50.0),
            (Constituent::Dai, 30.0),
            (Constituent::Frax, 20.0),
            (Constituent::Link, 15.0),
            (Constituent::Uni, 5.0),
        ]);
        let weights = compute_weights(&comp, 400.0).unwrap();

        assert!((weights.get(AssetClass::Stables) - 0.5).abs() < 1e-12);
        assert!((weights.get(AssetClass::LinkAndUni) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn zero_total_fails_fast() {
        let comp = composition(&[(Constituent::Eth, 1.0)]);
        let err = compute_weights(&comp, 0.0).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Precondition);
        assert_eq!(err.check(), Check::CompositionTotal);
    }

    #[test]
    fn nan_total_fails_fast() {
        let err = compute_weights(&BTreeMap::new(), f64::NAN).unwrap_err();
        assert_eq!(err.check(), Check::CompositionTotal);
    }

    #[test]
    fn negative_amount_is_rejected() {
        let comp = composition(&[(Constituent::Dai, -5.0)]);
        let err = compute_weights(&comp, 100.0).unwrap_err();

        assert_eq!(err.check(), Check::CompositionAmount);
        assert_eq!(err.quantity(), "dai_composition");
    }

    #[test]
    fn class_above_total_is_rejected() {
        let comp = composition(&[(Constituent::Link, 80.0), (Constituent::Uni, 30.0)]);
        let err = compute_weights(&comp, 100.0).unwrap_err();

        assert_eq!(err.quantity(), "link_and_uni_composition");
    }

    #[test]
    fn every_weight_lies_in_unit_interval() {
        let totals = [1.0, 37.5, 1_000.0, 2.5e9];
        for total in totals {
            for step in 0..=10 {
                let share = f64::from(step) / 10.0;
                let comp = composition(&[
                    (Constituent::Eth, total * share),
                    (Constituent::Usdc, total * (1.0 - share) / 2.0),
                    (Constituent::Usdt, total * (1.0 - share) / 2.0),
                ]);
                let weights = compute_weights(&comp, total).unwrap();
                for (class, weight) in weights.iter() {
                    assert!(
                        (0.0..=1.0).contains(&weight),
                        "{class} weight {weight} outside [0, 1] for total {total}"
                    );
                }
            }
        }
    }
}
