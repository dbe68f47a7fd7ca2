//! Property-based tests for normalization, resolution, discounting and
//! aggregation, using `proptest` for random case generation.

use proptest::prelude::*;
use std::collections::BTreeMap;

use zero_valuation::statement::{normalize, resolve, Frequency, StatementTable};
use zero_valuation::valuation::dcf::{discount, effective_discount_rate, MIN_TERMINAL_SPREAD};
use zero_valuation::valuation::{
    aggregate, AssumptionSet, CalculationLog, FinancialInputs, FinancialSnapshot, ModelKind,
    ModelResult, ModelStatus, SensitivityAnalyzer, ValuationEngine,
};

// =============================================================================
// Generators
// =============================================================================

/// Distinct (year, quarter length) periods in arbitrary order.
fn arb_periods() -> impl Strategy<Value = Vec<(i32, u8)>> {
    proptest::collection::btree_set((2015i32..2025, 1u8..=4), 1..12)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn report_table(periods: &[(i32, u8)]) -> StatementTable {
    StatementTable::from_rows(
        &["yearReport", "lengthReport", "Net income"],
        periods
            .iter()
            .map(|(year, length)| vec![f64::from(*year), f64::from(*length), 1.0])
            .collect(),
    )
}

fn arb_snapshot() -> impl Strategy<Value = FinancialSnapshot> {
    (
        -1e6f64..1e6,
        0f64..1e5,
        0f64..1e5,
        -1e5f64..1e5,
        0f64..1e6,
    )
        .prop_map(|(net_income, depreciation, capex, working_capital, equity)| FinancialSnapshot {
            net_income_ttm: net_income,
            depreciation,
            capex,
            working_capital_change: working_capital,
            total_equity: equity,
            ..Default::default()
        })
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn quarter_window_is_latest_four_descending(periods in arb_periods()) {
        let normalized = normalize(&report_table(&periods), Frequency::Quarter);
        let kept = normalized.table.periods();

        prop_assert_eq!(normalized.frequency, Frequency::Quarter);
        prop_assert_eq!(kept.len(), periods.len().min(4));
        for pair in kept.windows(2) {
            prop_assert!((pair[0].year, pair[0].quarter_length) > (pair[1].year, pair[1].quarter_length));
        }
        let newest = periods.iter().max().copied();
        prop_assert_eq!(kept.first().map(|p| (p.year, p.quarter_length)), newest);
    }

    #[test]
    fn year_window_is_latest_full_year(periods in arb_periods()) {
        let normalized = normalize(&report_table(&periods), Frequency::Year);
        let kept = normalized.table.periods();
        prop_assert_eq!(kept.len(), 1);

        let expected = periods
            .iter()
            .filter(|(_, length)| *length == 4)
            .max()
            .or_else(|| periods.iter().max())
            .copied();
        prop_assert_eq!(Some((kept[0].year, kept[0].quarter_length)), expected);
    }

    #[test]
    fn empty_table_resolves_to_zero(target in "[A-Za-z ]{1,30}", quarterly in any::<bool>()) {
        prop_assert_eq!(resolve(&StatementTable::empty(), &[target.as_str()], quarterly), 0.0);
    }

    #[test]
    fn terminal_rate_always_exceeds_growth(rate in -0.5f64..0.5, growth in -0.2f64..0.3) {
        let effective = effective_discount_rate(rate, growth, MIN_TERMINAL_SPREAD);
        prop_assert!(effective > growth);
        prop_assert!(effective >= rate);
    }

    #[test]
    fn terminal_value_follows_gordon_growth(
        base in 1.0f64..1e6,
        short_term in -0.1f64..0.2,
        growth in 0.0f64..0.05,
        rate in 0.06f64..0.2,
        years in 1u32..15,
    ) {
        let schedule = discount(base, short_term, growth, rate, years, MIN_TERMINAL_SPREAD).unwrap();
        let last = base * (1.0 + short_term).powi(years as i32);
        let expected = last * (1.0 + growth) / (rate - growth);

        prop_assert_eq!(schedule.projected_flows.len(), years as usize);
        prop_assert!((schedule.terminal_value - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        let total: f64 = schedule.present_values.iter().sum::<f64>() + schedule.pv_terminal;
        prop_assert!((schedule.total_present_value - total).abs() <= 1e-9 * total.abs().max(1.0));
    }

    #[test]
    fn weighted_average_within_valid_range(
        values in proptest::collection::vec(-1e4f64..1e4, 4),
        weights in proptest::collection::vec(0.01f64..10.0, 4),
    ) {
        let results: Vec<ModelResult> = ModelKind::ALL
            .iter()
            .zip(&values)
            .map(|(kind, value)| ModelResult {
                model: *kind,
                share_value: *value,
                status: ModelStatus::Computed,
                detail: None,
            })
            .collect();
        let weight_map: BTreeMap<String, f64> = ModelKind::ALL
            .iter()
            .zip(&weights)
            .map(|(kind, w)| (kind.as_str().to_string(), *w))
            .collect();
        let refs: Vec<&ModelResult> = results.iter().collect();
        let blended = aggregate(&refs, &weight_map);

        let positive = values.iter().filter(|v| **v > 0.0).count();
        match blended.summary {
            None => {
                prop_assert_eq!(positive, 0);
                prop_assert_eq!(blended.weighted_average, 0.0);
            }
            Some(summary) => {
                prop_assert_eq!(summary.models_used, positive);
                prop_assert_eq!(summary.total_models, 4);
                let slack = 1e-9 * summary.max;
                prop_assert!(blended.weighted_average >= summary.min - slack);
                prop_assert!(blended.weighted_average <= summary.max + slack);
            }
        }
    }

    #[test]
    fn non_positive_shares_value_everything_at_zero(
        snapshot in arb_snapshot(),
        shares in -1e9f64..=0.0,
    ) {
        let engine = ValuationEngine::new();
        let inputs = FinancialInputs::from_snapshot(&snapshot, Frequency::Year);
        let assumptions = AssumptionSet::default();
        for kind in ModelKind::ALL {
            prop_assert_eq!(engine.run(kind, &inputs, shares, &assumptions, None).share_value, 0.0);
        }
    }

    #[test]
    fn sensitivity_headers_ascend(wacc in 0.05f64..0.2, growth in 0.0f64..0.04) {
        let engine = ValuationEngine::new();
        let inputs = FinancialInputs::from_snapshot(
            &FinancialSnapshot { net_income_ttm: 100.0, ..Default::default() },
            Frequency::Year,
        );
        let assumptions = AssumptionSet::default().with_rates(wacc, growth);
        let grid = SensitivityAnalyzer::new().analyze(&engine, &inputs, 1.0, &assumptions).unwrap();

        prop_assert!(grid.row_headers.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(grid.col_headers.windows(2).all(|w| w[0] < w[1]));
        let center = engine.fcff(&inputs, 1.0, &assumptions, CalculationLog::Quiet);
        prop_assert_eq!(grid.values[2][2], center.share_value.trunc() as i64);
    }
}
