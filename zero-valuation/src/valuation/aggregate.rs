//! Blends model outputs into one fair value.

use std::collections::BTreeMap;

use super::types::{ModelKind, ModelResult, ValuationSummary};

/// Weighted fair value with summary statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub weighted_average: f64,
    /// `None` when no weighted model produced a positive value
    pub summary: Option<ValuationSummary>,
}

/// Combine model results.
///
/// Only models that appear in `weights` and produced a strictly positive value
/// take part. The weighted average is Σ(v·w)/Σw over those models and the
/// summary covers the same subset. When their weights sum to zero the average
/// is 0 and there is no summary.
pub fn aggregate(results: &[&ModelResult], weights: &BTreeMap<String, f64>) -> Aggregate {
    let valid: Vec<(f64, f64)> = results
        .iter()
        .filter(|r| r.share_value.is_finite() && r.share_value > 0.0)
        .filter_map(|r| weights.get(r.model.as_str()).map(|w| (r.share_value, *w)))
        .collect();

    if valid.is_empty() {
        tracing::debug!("No model produced a positive value");
        return Aggregate {
            weighted_average: 0.0,
            summary: None,
        };
    }

    let total_weight: f64 = valid.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        tracing::debug!(models = valid.len(), "Valid models carry no weight");
        return Aggregate {
            weighted_average: 0.0,
            summary: None,
        };
    }
    let weighted_average = valid.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight;

    let values: Vec<f64> = valid.iter().map(|(v, _)| *v).collect();
    let summary = ValuationSummary {
        average: values.iter().sum::<f64>() / values.len() as f64,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        models_used: values.len(),
        total_models: ModelKind::ALL.len(),
    };

    Aggregate {
        weighted_average,
        summary: Some(summary),
    }
}
