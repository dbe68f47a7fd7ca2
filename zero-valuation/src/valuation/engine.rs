//! Valuation engine.
//!
//! Four independent models over the same [`FinancialInputs`]. A model that
//! cannot run returns a degraded result worth zero; it never fails the others.

use super::dcf::{discount, MIN_TERMINAL_SPREAD};
use super::inputs::FinancialInputs;
use super::types::*;
use crate::peers::PeerStatistics;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// P/E applied when no usable sector median exists
    pub fallback_pe: f64,
    /// P/B applied when no usable sector median exists
    pub fallback_pb: f64,
    /// Minimum gap between terminal discount rate and terminal growth
    pub min_terminal_spread: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_pe: 15.0,
            fallback_pb: 1.5,
            min_terminal_spread: MIN_TERMINAL_SPREAD,
        }
    }
}

/// Whether a discounted model logs its calculation breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationLog {
    Emit,
    /// Used for sensitivity grid runs
    Quiet,
}

/// Runs the valuation models.
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: EngineConfig,
}

impl ValuationEngine {
    /// Create an engine with default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one model.
    pub fn run(
        &self,
        kind: ModelKind,
        inputs: &FinancialInputs,
        shares: f64,
        assumptions: &AssumptionSet,
        peers: Option<&PeerStatistics>,
    ) -> ModelResult {
        match kind {
            ModelKind::Fcfe => self.fcfe(inputs, shares, assumptions, CalculationLog::Emit),
            ModelKind::Fcff => self.fcff(inputs, shares, assumptions, CalculationLog::Emit),
            ModelKind::JustifiedPe => self.justified_pe(inputs, shares, peers),
            ModelKind::JustifiedPb => self.justified_pb(inputs, shares, peers),
        }
    }

    /// Discounted free cash flow to equity at the cost of equity.
    pub fn fcfe(
        &self,
        inputs: &FinancialInputs,
        shares: f64,
        assumptions: &AssumptionSet,
        log: CalculationLog,
    ) -> ModelResult {
        let components = inputs.equity_components();
        let base_fcfe = inputs.fcfe_base();
        let short_term_growth = assumptions.short_term_growth();

        let schedule = match discount(
            base_fcfe,
            short_term_growth,
            assumptions.terminal_growth,
            assumptions.cost_of_equity,
            assumptions.forecast_years,
            self.config.min_terminal_spread,
        ) {
            Ok(schedule) => schedule,
            Err(e) => return degrade(ModelKind::Fcfe, e, None, log),
        };

        let equity_value = schedule.total_present_value;
        let detail = DiscountedDetail {
            inputs: components,
            schedule,
            enterprise_value: None,
            short_term_debt: None,
            long_term_debt: None,
            total_debt: None,
            cash: None,
            equity_value,
            shares_outstanding: shares,
            assumptions: DiscountAssumptions {
                discount_rate: assumptions.cost_of_equity,
                short_term_growth,
                terminal_growth: assumptions.terminal_growth,
                forecast_years: assumptions.forecast_years,
                tax_rate: None,
            },
        };

        let result = per_share(
            ModelKind::Fcfe,
            equity_value,
            shares,
            ModelDetail::Discounted(detail),
            log,
        );

        if log == CalculationLog::Emit {
            tracing::info!(
                model = "fcfe",
                net_income = inputs.net_income,
                depreciation = inputs.depreciation,
                net_borrowing = inputs.net_borrowing,
                working_capital_investment = inputs.working_capital_investment,
                fixed_capital_investment = inputs.fixed_capital_investment,
                base_fcfe,
                equity_value,
                shares_outstanding = shares,
                fair_value = result.share_value,
                "FCFE calculation"
            );
        }
        result
    }

    /// Discounted free cash flow to the firm at WACC, bridged to equity.
    pub fn fcff(
        &self,
        inputs: &FinancialInputs,
        shares: f64,
        assumptions: &AssumptionSet,
        log: CalculationLog,
    ) -> ModelResult {
        let tax_rate = assumptions.tax_rate;
        let components = inputs.firm_components(tax_rate);
        let base_fcff = inputs.fcff_base(tax_rate);
        let short_term_growth = assumptions.short_term_growth();

        let schedule = match discount(
            base_fcff,
            short_term_growth,
            assumptions.terminal_growth,
            assumptions.wacc,
            assumptions.forecast_years,
            self.config.min_terminal_spread,
        ) {
            Ok(schedule) => schedule,
            Err(e) => return degrade(ModelKind::Fcff, e, None, log),
        };

        let enterprise_value = schedule.total_present_value;
        let equity_value = enterprise_value - inputs.total_debt + inputs.cash;
        let detail = DiscountedDetail {
            inputs: components,
            schedule,
            enterprise_value: Some(enterprise_value),
            short_term_debt: Some(inputs.short_term_debt),
            long_term_debt: Some(inputs.long_term_debt),
            total_debt: Some(inputs.total_debt),
            cash: Some(inputs.cash),
            equity_value,
            shares_outstanding: shares,
            assumptions: DiscountAssumptions {
                discount_rate: assumptions.wacc,
                short_term_growth,
                terminal_growth: assumptions.terminal_growth,
                forecast_years: assumptions.forecast_years,
                tax_rate: Some(tax_rate),
            },
        };

        let result = per_share(
            ModelKind::Fcff,
            equity_value,
            shares,
            ModelDetail::Discounted(detail),
            log,
        );

        if log == CalculationLog::Emit {
            tracing::info!(
                model = "fcff",
                net_income = inputs.net_income,
                depreciation = inputs.depreciation,
                interest_after_tax = inputs.interest_after_tax(tax_rate),
                working_capital_investment = inputs.working_capital_investment,
                fixed_capital_investment = inputs.fixed_capital_investment,
                base_fcff,
                enterprise_value,
                total_debt = inputs.total_debt,
                cash = inputs.cash,
                equity_value,
                shares_outstanding = shares,
                fair_value = result.share_value,
                "FCFF calculation"
            );
        }
        result
    }

    /// Sector median P/E times earnings per share.
    pub fn justified_pe(
        &self,
        inputs: &FinancialInputs,
        shares: f64,
        peers: Option<&PeerStatistics>,
    ) -> ModelResult {
        if !(shares.is_finite() && shares > 0.0) {
            return degrade(
                ModelKind::JustifiedPe,
                ModelError::NonPositiveShares { shares },
                None,
                CalculationLog::Emit,
            );
        }

        let eps = inputs
            .earnings_per_share
            .unwrap_or(inputs.net_income / shares);
        let (multiple, source) = match peers.and_then(PeerStatistics::usable_pe) {
            Some(pe) => (pe, MultipleSource::SectorMedian),
            None => (self.config.fallback_pe, MultipleSource::MarketFallback),
        };
        let value = if eps > 0.0 { multiple * eps } else { 0.0 };

        tracing::debug!(eps, multiple, source = ?source, value, "Justified P/E");
        finish_multiple(
            ModelKind::JustifiedPe,
            value,
            MultipleDetail {
                multiple,
                source,
                per_share_base: eps,
                base_value: inputs.net_income,
                shares_outstanding: shares,
                peer_sector: peers.map(|p| p.sector.clone()),
            },
        )
    }

    /// Sector median P/B times book value per share.
    pub fn justified_pb(
        &self,
        inputs: &FinancialInputs,
        shares: f64,
        peers: Option<&PeerStatistics>,
    ) -> ModelResult {
        if !(shares.is_finite() && shares > 0.0) {
            return degrade(
                ModelKind::JustifiedPb,
                ModelError::NonPositiveShares { shares },
                None,
                CalculationLog::Emit,
            );
        }

        let equity = inputs.book_equity();
        let bvps = equity / shares;
        let (multiple, source) = match peers.and_then(PeerStatistics::usable_pb) {
            Some(pb) => (pb, MultipleSource::SectorMedian),
            None => (self.config.fallback_pb, MultipleSource::MarketFallback),
        };
        let value = if bvps > 0.0 { multiple * bvps } else { 0.0 };

        tracing::debug!(bvps, multiple, source = ?source, value, "Justified P/B");
        finish_multiple(
            ModelKind::JustifiedPb,
            value,
            MultipleDetail {
                multiple,
                source,
                per_share_base: bvps,
                base_value: equity,
                shares_outstanding: shares,
                peer_sector: peers.map(|p| p.sector.clone()),
            },
        )
    }
}

fn per_share(
    model: ModelKind,
    equity_value: f64,
    shares: f64,
    detail: ModelDetail,
    log: CalculationLog,
) -> ModelResult {
    if !(shares.is_finite() && shares > 0.0) {
        return degrade(model, ModelError::NonPositiveShares { shares }, Some(detail), log);
    }
    let value = equity_value / shares;
    if !value.is_finite() {
        return degrade(
            model,
            ModelError::NonFinite {
                quantity: "value per share",
            },
            Some(detail),
            log,
        );
    }
    ModelResult::computed(model, value, detail)
}

fn finish_multiple(model: ModelKind, value: f64, detail: MultipleDetail) -> ModelResult {
    if value.is_finite() {
        ModelResult::computed(model, value, ModelDetail::Multiple(detail))
    } else {
        degrade(
            model,
            ModelError::NonFinite {
                quantity: "value per share",
            },
            Some(ModelDetail::Multiple(detail)),
            CalculationLog::Emit,
        )
    }
}

fn degrade(
    model: ModelKind,
    error: ModelError,
    detail: Option<ModelDetail>,
    log: CalculationLog,
) -> ModelResult {
    if log == CalculationLog::Emit {
        tracing::warn!(model = %model, reason = %error, "Model degraded to zero");
    }
    ModelResult::degraded(model, &error, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peers::SectorMatch;
    use crate::statement::Frequency;

    fn snapshot_inputs() -> FinancialInputs {
        FinancialInputs::from_snapshot(
            &FinancialSnapshot {
                net_income_ttm: 200_000_000_000.0,
                depreciation: 100_000_000_000.0,
                capex: -200_000_000_000.0,
                total_debt: 3_000_000_000_000.0,
                cash: 1_000_000_000_000.0,
                total_assets: 10_000_000_000_000.0,
                total_liabilities: 6_000_000_000_000.0,
                ..Default::default()
            },
            Frequency::Year,
        )
    }

    fn peers(pe: Option<f64>, pb: Option<f64>) -> PeerStatistics {
        PeerStatistics {
            sector: "Ngân hàng".into(),
            median_pe: pe,
            median_pb: pb,
            peers: Vec::new(),
            peer_count: 0,
            total_in_sector: 0,
            matched_by: SectorMatch::Exact,
        }
    }

    #[test]
    fn test_fcfe_matches_discount_schedule() {
        let engine = ValuationEngine::new();
        let inputs = snapshot_inputs();
        let result = engine.fcfe(&inputs, 1e9, &AssumptionSet::default(), CalculationLog::Quiet);

        assert_eq!(result.status, ModelStatus::Computed);
        let Some(ModelDetail::Discounted(detail)) = &result.detail else {
            panic!("expected discounted detail");
        };
        // 200B + 100B - 200B
        assert!((detail.schedule.base_flow - 100_000_000_000.0).abs() < 1.0);
        assert!((result.share_value - detail.equity_value / 1e9).abs() < 1e-6);
        assert!(result.share_value > 0.0);
    }

    #[test]
    fn test_fcff_bridges_debt_and_cash() {
        let engine = ValuationEngine::new();
        let inputs = snapshot_inputs();
        let result = engine.fcff(&inputs, 1e9, &AssumptionSet::default(), CalculationLog::Quiet);

        let Some(ModelDetail::Discounted(detail)) = &result.detail else {
            panic!("expected discounted detail");
        };
        let ev = detail.enterprise_value.unwrap();
        assert!((detail.equity_value - (ev - 3e12 + 1e12)).abs() < 1.0);
        assert_eq!(detail.assumptions.discount_rate, 0.10);
    }

    #[test]
    fn test_zero_horizon_degrades() {
        let engine = ValuationEngine::new();
        let assumptions = AssumptionSet {
            forecast_years: 0,
            ..Default::default()
        };
        let result = engine.fcfe(&snapshot_inputs(), 1e9, &assumptions, CalculationLog::Quiet);
        assert!(result.is_degraded());
        assert_eq!(result.share_value, 0.0);
    }

    #[test]
    fn test_oversized_horizon_degrades() {
        let engine = ValuationEngine::new();
        let assumptions = AssumptionSet {
            forecast_years: u32::MAX,
            ..Default::default()
        };
        for result in [
            engine.fcfe(&snapshot_inputs(), 1e9, &assumptions, CalculationLog::Quiet),
            engine.fcff(&snapshot_inputs(), 1e9, &assumptions, CalculationLog::Quiet),
        ] {
            assert!(result.is_degraded());
            assert_eq!(result.share_value, 0.0);
        }
    }

    #[test]
    fn test_zero_shares_gives_zero_everywhere() {
        let engine = ValuationEngine::new();
        let inputs = snapshot_inputs();
        let assumptions = AssumptionSet::default();
        for kind in ModelKind::ALL {
            let result = engine.run(kind, &inputs, 0.0, &assumptions, None);
            assert_eq!(result.share_value, 0.0, "{kind}");
            assert!(result.is_degraded(), "{kind}");
        }
    }

    #[test]
    fn test_fallback_multiples() {
        let engine = ValuationEngine::new();
        let inputs = snapshot_inputs();

        let pe = engine.justified_pe(&inputs, 1e9, None);
        assert!((pe.share_value - 15.0 * 200.0).abs() < 1e-6);

        let pb = engine.justified_pb(&inputs, 1e9, Some(&peers(Some(9.0), Some(-1.0))));
        let Some(ModelDetail::Multiple(detail)) = &pb.detail else {
            panic!("expected multiple detail");
        };
        assert_eq!(detail.source, MultipleSource::MarketFallback);
        assert_eq!(detail.multiple, 1.5);
        assert!((pb.share_value - 1.5 * 4000.0).abs() < 1e-6);
    }

    #[test]
    fn test_sector_median_multiples() {
        let engine = ValuationEngine::new();
        let inputs = snapshot_inputs();
        let stats = peers(Some(10.0), Some(2.0));

        let pe = engine.justified_pe(&inputs, 1e9, Some(&stats));
        assert!((pe.share_value - 2000.0).abs() < 1e-6);
        let pb = engine.justified_pb(&inputs, 1e9, Some(&stats));
        assert!((pb.share_value - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_loss_making_company_values_zero() {
        let engine = ValuationEngine::new();
        let inputs = FinancialInputs {
            net_income: -5.0,
            ..snapshot_inputs()
        };
        let pe = engine.justified_pe(&inputs, 1e9, None);
        assert_eq!(pe.share_value, 0.0);
        assert_eq!(pe.status, ModelStatus::Computed);
    }

    #[test]
    fn test_supplied_eps_overrides_net_income() {
        let engine = ValuationEngine::new();
        let inputs = FinancialInputs {
            earnings_per_share: Some(3000.0),
            ..snapshot_inputs()
        };
        let pe = engine.justified_pe(&inputs, 1e9, Some(&peers(Some(8.0), None)));
        assert!((pe.share_value - 24_000.0).abs() < 1e-6);
    }
}
