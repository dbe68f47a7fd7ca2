//! FCFF sensitivity grid over WACC and terminal growth.

use super::engine::{CalculationLog, ValuationEngine};
use super::inputs::FinancialInputs;
use super::types::{AssumptionSet, ModelError, SensitivityMatrix};

/// Perturbations applied to both axes.
pub const GRID_OFFSETS: [f64; 5] = [-0.01, -0.005, 0.0, 0.005, 0.01];

/// Builds the 5×5 FCFF grid.
#[derive(Debug, Clone)]
pub struct SensitivityAnalyzer {
    offsets: [f64; 5],
}

impl Default for SensitivityAnalyzer {
    fn default() -> Self {
        Self {
            offsets: GRID_OFFSETS,
        }
    }
}

impl SensitivityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-run FCFF for every (WACC, terminal growth) pair around the base
    /// assumptions. Cells hold the per-share value truncated toward zero.
    pub fn analyze(
        &self,
        engine: &ValuationEngine,
        inputs: &FinancialInputs,
        shares: f64,
        assumptions: &AssumptionSet,
    ) -> Result<SensitivityMatrix, ModelError> {
        if !assumptions.wacc.is_finite() {
            return Err(ModelError::NonFinite { quantity: "wacc" });
        }
        if !assumptions.terminal_growth.is_finite() {
            return Err(ModelError::NonFinite {
                quantity: "terminal growth",
            });
        }

        let rates: Vec<f64> = self.offsets.iter().map(|o| assumptions.wacc + o).collect();
        let growths: Vec<f64> = self
            .offsets
            .iter()
            .map(|o| assumptions.terminal_growth + o)
            .collect();

        let values = rates
            .iter()
            .map(|&wacc| {
                growths
                    .iter()
                    .map(|&growth| {
                        let scenario = assumptions.with_rates(wacc, growth);
                        let result = engine.fcff(inputs, shares, &scenario, CalculationLog::Quiet);
                        result.share_value.trunc() as i64
                    })
                    .collect()
            })
            .collect();

        Ok(SensitivityMatrix {
            row_headers: rates.iter().map(|&r| as_percent(r)).collect(),
            col_headers: growths.iter().map(|&g| as_percent(g)).collect(),
            values,
        })
    }
}

/// Rate as a percentage rounded to one decimal.
fn as_percent(rate: f64) -> f64 {
    (rate * 1000.0).round() / 10.0
}
