//! Shared discounting math for the FCFE and FCFF models.

use super::types::{DiscountSchedule, ModelError};

/// Minimum gap kept between the terminal discount rate and terminal growth.
pub const MIN_TERMINAL_SPREAD: f64 = 0.02;

/// Longest forecast horizon a discounted model accepts.
pub const MAX_FORECAST_YEARS: u32 = 50;

/// Rate used in the terminal value denominator.
///
/// Returns `rate` when it exceeds `growth`, otherwise `max(rate, growth + spread)`.
pub fn effective_discount_rate(rate: f64, growth: f64, min_spread: f64) -> f64 {
    if rate > growth {
        rate
    } else {
        rate.max(growth + min_spread)
    }
}

/// Gordon growth terminal value of the flow after `last_flow`.
pub fn terminal_value(last_flow: f64, growth: f64, effective_rate: f64) -> f64 {
    last_flow * (1.0 + growth) / (effective_rate - growth)
}

/// Project `base_flow` over `years` and discount it back at `rate`.
///
/// Flows grow at `short_term_growth`; the terminal value grows at
/// `terminal_growth` and uses the spread-protected rate, while every present
/// value uses the raw `rate`.
pub fn discount(
    base_flow: f64,
    short_term_growth: f64,
    terminal_growth: f64,
    rate: f64,
    years: u32,
    min_spread: f64,
) -> Result<DiscountSchedule, ModelError> {
    if years == 0 {
        return Err(ModelError::EmptyHorizon);
    }
    if years > MAX_FORECAST_YEARS {
        return Err(ModelError::HorizonTooLong {
            years,
            max: MAX_FORECAST_YEARS,
        });
    }
    if !rate.is_finite() || 1.0 + rate <= 0.0 {
        return Err(ModelError::InvalidDiscountRate { rate });
    }
    ensure_finite("base flow", base_flow)?;

    let projected_flows: Vec<f64> = (1..=years)
        .map(|t| base_flow * (1.0 + short_term_growth).powi(t as i32))
        .collect();
    let present_values: Vec<f64> = projected_flows
        .iter()
        .zip(1..=years)
        .map(|(flow, t)| flow / (1.0 + rate).powi(t as i32))
        .collect();

    let last_flow = projected_flows.last().copied().unwrap_or(base_flow);
    let terminal_discount_rate = effective_discount_rate(rate, terminal_growth, min_spread);
    let terminal = terminal_value(last_flow, terminal_growth, terminal_discount_rate);
    let pv_terminal = terminal / (1.0 + rate).powi(years as i32);
    let total_present_value = present_values.iter().sum::<f64>() + pv_terminal;

    ensure_finite("terminal value", terminal)?;
    ensure_finite("present value", total_present_value)?;

    Ok(DiscountSchedule {
        base_flow,
        projected_flows,
        present_values,
        discount_rate: rate,
        terminal_discount_rate,
        terminal_value: terminal,
        pv_terminal,
        total_present_value,
    })
}

fn ensure_finite(quantity: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::NonFinite { quantity })
    }
}
