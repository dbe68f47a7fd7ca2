//! Statement accessor abstraction.
//!
//! Defines the `StatementAccessor` trait that every statement source implements.
//! Retrieval (network calls, authentication, rate limiting) lives behind it; the
//! valuation core only sees tables or a `ProviderError`.

use std::fmt;
use std::sync::Arc;

use super::{Frequency, StatementKind, StatementTable};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors reported by statement sources.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Authentication error (invalid token, expired)
    Auth(String),
    /// Rate limit exceeded
    RateLimited { retry_after_secs: Option<u64> },
    /// No statement for the requested symbol/kind/frequency
    DataNotAvailable(String),
    /// Source is temporarily unavailable
    Unavailable(String),
    /// Payload could not be decoded
    InvalidResponse(String),
    /// Internal source error
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Auth(msg) => write!(f, "Authentication error: {}", msg),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {} seconds", secs)?;
                }
                Ok(())
            }
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Check if the error is transient (a later session may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Unavailable(_)
        )
    }
}

impl From<ProviderError> for zero_common::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::DataNotAvailable(msg) => Self::NotFound(msg),
            other => Self::External(other.to_string()),
        }
    }
}

// ============================================================================
// Statement Accessor Trait
// ============================================================================

/// Source of raw financial statements.
///
/// Implementations report missing data as [`ProviderError::DataNotAvailable`];
/// the session cache turns any error into an empty table.
pub trait StatementAccessor {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Fetch one statement table.
    fn statement(
        &self,
        symbol: &str,
        kind: StatementKind,
        frequency: Frequency,
    ) -> Result<StatementTable, ProviderError>;

    /// Listed shares, when the source knows them.
    fn shares_outstanding(&self, _symbol: &str) -> Option<f64> {
        None
    }

    /// Sector label used to look up peer multiples.
    fn sector(&self, _symbol: &str) -> Option<String> {
        None
    }
}

impl<T: StatementAccessor + ?Sized> StatementAccessor for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn statement(
        &self,
        symbol: &str,
        kind: StatementKind,
        frequency: Frequency,
    ) -> Result<StatementTable, ProviderError> {
        (**self).statement(symbol, kind, frequency)
    }

    fn shares_outstanding(&self, symbol: &str) -> Option<f64> {
        (**self).shares_outstanding(symbol)
    }

    fn sector(&self, symbol: &str) -> Option<String> {
        (**self).sector(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
        assert!(err.is_recoverable());

        let err = ProviderError::DataNotAvailable("FPT income/year".into());
        assert_eq!(err.to_string(), "Data not available: FPT income/year");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_into_common_error() {
        let err: zero_common::Error = ProviderError::DataNotAvailable("VNM".into()).into();
        assert!(matches!(err, zero_common::Error::NotFound(_)));

        let err: zero_common::Error = ProviderError::Auth("expired".into()).into();
        assert!(matches!(err, zero_common::Error::External(_)));
    }
}
