//! Valuation Module.
//!
//! Four independent per-share fair value models over the same financial inputs:
//!
//! 1. **FCFE**: free cash flow to equity, discounted at the cost of equity
//! 2. **FCFF**: free cash flow to the firm, discounted at WACC and bridged to
//!    equity through debt and cash
//! 3. **Justified P/E**: sector median P/E applied to EPS
//! 4. **Justified P/B**: sector median P/B applied to book value per share
//!
//! Results are blended by [`aggregate`] and the FCFF model is stress-tested by
//! [`SensitivityAnalyzer`].
//!
//! # Usage
//!
//! ```ignore
//! use zero_valuation::valuation::{AssumptionSet, FinancialInputs, ValuationEngine};
//!
//! let engine = ValuationEngine::new();
//! let inputs = FinancialInputs::from_snapshot(&snapshot, Frequency::Year);
//! let fcff = engine.run(ModelKind::Fcff, &inputs, shares, &AssumptionSet::default(), None);
//!
//! println!("FCFF fair value: {:.0}", fcff.share_value);
//! ```

pub mod aggregate;
pub mod dcf;
pub mod engine;
pub mod inputs;
pub mod sensitivity;
pub mod types;

pub use aggregate::{aggregate, Aggregate};
pub use engine::{CalculationLog, EngineConfig, ValuationEngine};
pub use inputs::{FinancialInputs, InputSource};
pub use sensitivity::SensitivityAnalyzer;
pub use types::{
    AssumptionSet, CashFlowInputs, DiscountSchedule, DiscountedDetail, FinancialSnapshot,
    ModelDetail, ModelError, ModelKind, ModelResult, ModelStatus, MultipleDetail, MultipleSource,
    SensitivityMatrix, ValuationReport, ValuationSummary,
};
