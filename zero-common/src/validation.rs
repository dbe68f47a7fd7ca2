//! Configuration validation.
//!
//! Checks configuration and user-supplied inputs before a valuation run so that
//! bad values fail loudly instead of producing silently wrong numbers.

use thiserror::Error;

use crate::config::{Config, ObservabilityConfig, ValuationConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Shorthand for an [`ValidationError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Fold collected errors into a single result.
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.valuation.validate() {
            errors.push(e);
        }

        ValidationError::collect(errors)
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::invalid(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}

impl Validate for ValuationConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        let valid_frequencies = ["year", "quarter"];
        if !valid_frequencies.contains(&self.default_frequency.to_lowercase().as_str()) {
            errors.push(ValidationError::invalid(
                "valuation.default_frequency",
                format!("must be one of: {}", valid_frequencies.join(", ")),
            ));
        }

        let shares = self.default_shares_outstanding;
        if !shares.is_finite() || shares <= 0.0 {
            errors.push(ValidationError::invalid(
                "valuation.default_shares_outstanding",
                format!("must be a positive number, got {shares}"),
            ));
        }

        for (field, value) in [
            ("valuation.data_dir", &self.data_dir),
            ("valuation.sector_peers_path", &self.sector_peers_path),
        ] {
            if matches!(value, Some(path) if path.trim().is_empty()) {
                errors.push(ValidationError::invalid(field, "must not be empty when set"));
            }
        }

        ValidationError::collect(errors)
    }
}
