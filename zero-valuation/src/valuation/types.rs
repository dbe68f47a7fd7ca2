//! Valuation data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use zero_common::{Validate, ValidationError, ValidationResult};

use super::dcf::MAX_FORECAST_YEARS;
use crate::peers::PeerStatistics;
use crate::statement::Frequency;

// ============================================================================
// Model Kinds
// ============================================================================

/// The four valuation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Discounted free cash flow to equity
    Fcfe,
    /// Discounted free cash flow to the firm
    Fcff,
    /// Sector median P/E applied to EPS
    JustifiedPe,
    /// Sector median P/B applied to book value per share
    JustifiedPb,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        Self::Fcfe,
        Self::Fcff,
        Self::JustifiedPe,
        Self::JustifiedPb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fcfe => "fcfe",
            Self::Fcff => "fcff",
            Self::JustifiedPe => "justified_pe",
            Self::JustifiedPb => "justified_pb",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown model '{s}'"))
    }
}

// ============================================================================
// Assumptions
// ============================================================================

/// Model inputs supplied by the analyst. Every key is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionSet {
    /// Growth of the base flow over the forecast horizon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_term_growth: Option<f64>,
    /// Used when `short_term_growth` is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth: Option<f64>,
    pub terminal_growth: f64,
    pub cost_of_equity: f64,
    pub wacc: f64,
    pub tax_rate: f64,
    pub payout_ratio: f64,
    pub roe: f64,
    pub forecast_years: u32,
    /// Statement frequency; absent means the caller's default applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_frequency: Option<Frequency>,
    /// Weight per model name; models missing here are left out of the average
    pub model_weights: BTreeMap<String, f64>,
}

/// Short-term growth when neither growth key is supplied.
pub const DEFAULT_SHORT_TERM_GROWTH: f64 = 0.05;

impl Default for AssumptionSet {
    fn default() -> Self {
        Self {
            short_term_growth: None,
            revenue_growth: None,
            terminal_growth: 0.02,
            cost_of_equity: 0.12,
            wacc: 0.10,
            tax_rate: 0.20,
            payout_ratio: 0.40,
            roe: 0.15,
            forecast_years: 5,
            data_frequency: None,
            model_weights: ModelKind::ALL
                .iter()
                .map(|kind| (kind.as_str().to_string(), 0.25))
                .collect(),
        }
    }
}

impl AssumptionSet {
    /// Effective short-term growth.
    pub fn short_term_growth(&self) -> f64 {
        self.short_term_growth
            .or(self.revenue_growth)
            .unwrap_or(DEFAULT_SHORT_TERM_GROWTH)
    }

    /// Statement frequency the run uses, annual unless set.
    pub fn frequency(&self) -> Frequency {
        self.data_frequency.unwrap_or_default()
    }

    /// Fill `data_frequency` when the assumptions left it unset.
    pub fn with_default_frequency(mut self, frequency: Frequency) -> Self {
        self.data_frequency.get_or_insert(frequency);
        self
    }

    /// Weight assigned to a model, if it takes part in the average.
    pub fn weight(&self, kind: ModelKind) -> Option<f64> {
        self.model_weights.get(kind.as_str()).copied()
    }

    /// Copy with WACC and terminal growth replaced.
    pub fn with_rates(&self, wacc: f64, terminal_growth: f64) -> Self {
        Self {
            wacc,
            terminal_growth,
            ..self.clone()
        }
    }
}

impl Validate for AssumptionSet {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        let mut rates = vec![
            ("terminal_growth", self.terminal_growth),
            ("cost_of_equity", self.cost_of_equity),
            ("wacc", self.wacc),
            ("roe", self.roe),
        ];
        if let Some(g) = self.short_term_growth {
            rates.push(("short_term_growth", g));
        }
        if let Some(g) = self.revenue_growth {
            rates.push(("revenue_growth", g));
        }
        for (field, value) in rates {
            if !value.is_finite() || value <= -1.0 {
                errors.push(ValidationError::invalid(
                    field,
                    format!("must be a finite rate above -100%, got {value}"),
                ));
            }
        }

        for (field, value) in [("tax_rate", self.tax_rate), ("payout_ratio", self.payout_ratio)] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ValidationError::invalid(
                    field,
                    format!("must be between 0 and 1, got {value}"),
                ));
            }
        }

        if !(1..=MAX_FORECAST_YEARS).contains(&self.forecast_years) {
            errors.push(ValidationError::invalid(
                "forecast_years",
                format!(
                    "must be between 1 and {MAX_FORECAST_YEARS}, got {}",
                    self.forecast_years
                ),
            ));
        }

        for (model, weight) in &self.model_weights {
            if model.parse::<ModelKind>().is_err() {
                errors.push(ValidationError::invalid(
                    format!("model_weights.{model}"),
                    "unknown model",
                ));
            } else if !weight.is_finite() || *weight < 0.0 {
                errors.push(ValidationError::invalid(
                    format!("model_weights.{model}"),
                    format!("must be a non-negative number, got {weight}"),
                ));
            }
        }

        ValidationError::collect(errors)
    }
}

// ============================================================================
// Directly Supplied Financials
// ============================================================================

/// Flat financial figures used instead of (or alongside) statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSnapshot {
    pub net_income_ttm: f64,
    pub depreciation: f64,
    /// Capital expenditure; sign is ignored
    pub capex: f64,
    pub net_borrowing: f64,
    pub working_capital_change: f64,
    pub interest_expense: f64,
    pub total_debt: f64,
    pub cash: f64,
    pub total_equity: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub shares_outstanding: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub sector: Option<String>,
}

// ============================================================================
// Model Results
// ============================================================================

/// Why a model could not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("forecast horizon must be at least one year")]
    EmptyHorizon,

    #[error("forecast horizon of {years} years exceeds the {max} year limit")]
    HorizonTooLong { years: u32, max: u32 },

    #[error("discount rate {rate} leaves no positive discount factor")]
    InvalidDiscountRate { rate: f64 },

    #[error("{quantity} is not a finite number")]
    NonFinite { quantity: &'static str },

    #[error("shares outstanding must be positive, got {shares}")]
    NonPositiveShares { shares: f64 },
}

/// Whether a model produced a real figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
    Computed,
    /// Value forced to zero
    Degraded { reason: String },
}

/// Output of one valuation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: ModelKind,
    /// Fair value per share; 0 when the model could not run
    pub share_value: f64,
    pub status: ModelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ModelDetail>,
}

impl ModelResult {
    pub fn computed(model: ModelKind, share_value: f64, detail: ModelDetail) -> Self {
        Self {
            model,
            share_value,
            status: ModelStatus::Computed,
            detail: Some(detail),
        }
    }

    pub fn degraded(model: ModelKind, error: &ModelError, detail: Option<ModelDetail>) -> Self {
        Self {
            model,
            share_value: 0.0,
            status: ModelStatus::Degraded {
                reason: error.to_string(),
            },
            detail,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ModelStatus::Degraded { .. })
    }
}

/// Model-specific breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelDetail {
    Discounted(DiscountedDetail),
    Multiple(MultipleDetail),
}

/// Projected and discounted flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountSchedule {
    pub base_flow: f64,
    pub projected_flows: Vec<f64>,
    pub present_values: Vec<f64>,
    /// Rate the flows were discounted at
    pub discount_rate: f64,
    /// Rate used in the terminal value denominator
    pub terminal_discount_rate: f64,
    pub terminal_value: f64,
    pub pv_terminal: f64,
    pub total_present_value: f64,
}

/// Line items behind a discounted model's base flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowInputs {
    pub net_income: f64,
    pub depreciation: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_borrowing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_expense: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_after_tax: Option<f64>,
    pub receivables_change: f64,
    pub inventories_change: f64,
    pub payables_change: f64,
    pub working_capital_investment: f64,
    /// Negative when capital was spent
    pub fixed_capital_investment: f64,
}

/// Assumptions a discounted model ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountAssumptions {
    pub discount_rate: f64,
    pub short_term_growth: f64,
    pub terminal_growth: f64,
    pub forecast_years: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

/// FCFE / FCFF breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedDetail {
    pub inputs: CashFlowInputs,
    pub schedule: DiscountSchedule,
    /// FCFF only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_term_debt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_term_debt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,
    pub equity_value: f64,
    pub shares_outstanding: f64,
    pub assumptions: DiscountAssumptions,
}

/// Where a multiple came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleSource {
    SectorMedian,
    MarketFallback,
}

/// Justified P/E or P/B breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleDetail {
    pub multiple: f64,
    pub source: MultipleSource,
    /// EPS or book value per share
    pub per_share_base: f64,
    /// Net income or total equity
    pub base_value: f64,
    pub shares_outstanding: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_sector: Option<String>,
}

// ============================================================================
// Report
// ============================================================================

/// Statistics over the models that produced a positive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub models_used: usize,
    pub total_models: usize,
}

/// FCFF per share over a grid of WACC (rows) and terminal growth (columns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    /// WACC in percent
    pub row_headers: Vec<f64>,
    /// Terminal growth in percent
    pub col_headers: Vec<f64>,
    pub values: Vec<Vec<i64>>,
}

/// Full result of a valuation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub session_id: Uuid,
    /// Frequency of the statement window actually used
    pub frequency: Frequency,
    pub shares_outstanding: f64,
    pub fcfe: ModelResult,
    pub fcff: ModelResult,
    pub justified_pe: ModelResult,
    pub justified_pb: ModelResult,
    pub weighted_average: f64,
    pub summary: Option<ValuationSummary>,
    pub sensitivity_analysis: Option<SensitivityMatrix>,
    pub sector_peers: Option<PeerStatistics>,
    pub generated_at: DateTime<Utc>,
}

impl ValuationReport {
    pub fn model(&self, kind: ModelKind) -> &ModelResult {
        match kind {
            ModelKind::Fcfe => &self.fcfe,
            ModelKind::Fcff => &self.fcff,
            ModelKind::JustifiedPe => &self.justified_pe,
            ModelKind::JustifiedPb => &self.justified_pb,
        }
    }

    pub fn models(&self) -> [&ModelResult; 4] {
        [&self.fcfe, &self.fcff, &self.justified_pe, &self.justified_pb]
    }
}
