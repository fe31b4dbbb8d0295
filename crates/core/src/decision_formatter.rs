#![allow(clippy::format_push_string)]

use crate::engine::DecisionRecord;

const RULE: &str = "═══════════════════════════════════════════════════════════════\n";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────\n";

pub struct DecisionFormatter;

impl DecisionFormatter {
    #[must_use]
    pub fn format(record: &DecisionRecord) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE);
        output.push_str("                    HEDGE EVALUATION                           \n");
        output.push_str(RULE);
        output.push('\n');

        output.push_str("Snapshot\n");
        output.push_str(THIN_RULE);
        output.push_str(&format!(
            "Observed:              {}\n",
            record.observed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "Evaluated:             {}\n",
            record.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "Basket Unit Price:     ${:.4}\n",
            record.basket_unit_price_usd
        ));
        for leg in record.legs.values() {
            output.push_str(&format!(
                "{:<23}${:.2}\n",
                format!("{} Price:", leg.asset.symbol()),
                leg.price_usd
            ));
        }
        output.push('\n');

        output.push_str("Exposure\n");
        output.push_str(THIN_RULE);
        for (bucket, weight) in record.exposure.iter() {
            output.push_str(&format!(
                "{:<23}{:.2}%\n",
                format!("{bucket} weight:"),
                weight * 100.0
            ));
        }
        output.push_str(&format!(
            "Units Valued:          {:.4}\n",
            record.units_valued
        ));
        output.push_str(&format!(
            "Held Value:            ${:.2}\n",
            record.held_value_usd
        ));
        output.push('\n');

        output.push_str("Hedge\n");
        output.push_str(THIN_RULE);
        for leg in record.legs.values() {
            let symbol = leg.asset.symbol();
            output.push_str(&format!(
                "{:<23}${:.2} ({:.6} {symbol})\n",
                format!("Intended {symbol} Short:"),
                leg.intended_short_usd,
                leg.intended_short_native
            ));
            output.push_str(&format!(
                "{:<23}${:.2} ({:.6} {symbol})\n",
                format!("Current {symbol} Short:"),
                leg.current_short_usd(),
                leg.current_short_native
            ));
            output.push_str(&format!(
                "{:<23}{}\n",
                format!("Rebalance {symbol}:"),
                if leg.rebalance { "YES" } else { "No" }
            ));
        }

        output.push('\n');
        output.push_str(RULE);

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HedgeConfig;
    use crate::engine::evaluate_at;
    use crate::snapshot::{Constituent, CurrentShorts, HedgeAsset, InputSnapshot};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record() -> DecisionRecord {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let snapshot = InputSnapshot {
            observed_at: now,
            basket_unit_price_usd: 1.0,
            basket_units_held: 10_000.0,
            risk_asset_prices_usd: BTreeMap::from([
                (HedgeAsset::Eth, 2_000.0),
                (HedgeAsset::Btc, 50_000.0),
            ]),
            basket_composition: BTreeMap::from([
                (Constituent::Eth, 300.0),
                (Constituent::Wbtc, 200.0),
                (Constituent::Usdc, 500.0),
            ]),
            total_basket_composition: 1000.0,
        };
        let shorts = CurrentShorts::new().with(HedgeAsset::Eth, 1.5);
        let config = HedgeConfig {
            max_held_value_usd: 50_000.0,
            ..HedgeConfig::default()
        };
        evaluate_at(&snapshot, &shorts, &config, now).unwrap()
    }

    #[test]
    fn report_lists_both_legs() {
        let report = DecisionFormatter::format(&record());

        assert!(report.contains("HEDGE EVALUATION"));
        assert!(report.contains("Observed:              2024-03-01 12:00:00 UTC"));
        assert!(report.contains("Held Value:            $10000.00"));
        assert!(report.contains("Intended ETH Short:    $3000.00 (1.500000 ETH)"));
        assert!(report.contains("Intended BTC Short:    $2000.00 (0.040000 BTC)"));
    }

    #[test]
    fn report_flags_rebalance_per_asset() {
        let report = DecisionFormatter::format(&record());

        assert!(report.contains("Rebalance ETH:         No"));
        assert!(report.contains("Rebalance BTC:         YES"));
    }
}
