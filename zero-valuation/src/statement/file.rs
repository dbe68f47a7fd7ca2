//! File-backed statement accessor.
//!
//! Reads statements exported by the data sync job:
//!
//! ```text
//! <root>/<SYMBOL>/income_year.json
//! <root>/<SYMBOL>/cashflow_quarter.json
//! <root>/<SYMBOL>/balance_year.json
//! <root>/<SYMBOL>/profile.json      {"shares_outstanding": ..., "sector": ...}
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Frequency, ProviderError, StatementAccessor, StatementKind, StatementTable};

/// Company facts stored next to the statements.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub shares_outstanding: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
}

/// Statement accessor over a directory of JSON exports.
#[derive(Debug, Clone)]
pub struct JsonStatementAccessor {
    root: PathBuf,
}

impl JsonStatementAccessor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(symbol.trim().to_uppercase())
    }

    /// Path of one statement export.
    pub fn statement_path(&self, symbol: &str, kind: StatementKind, frequency: Frequency) -> PathBuf {
        self.symbol_dir(symbol)
            .join(format!("{}_{}.json", kind.as_str(), frequency.as_str()))
    }

    /// Company profile, if one was exported.
    pub fn profile(&self, symbol: &str) -> Option<CompanyProfile> {
        let path = self.symbol_dir(symbol).join("profile.json");
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed profile");
                None
            }
        }
    }
}

impl StatementAccessor for JsonStatementAccessor {
    fn name(&self) -> &str {
        "json_files"
    }

    fn statement(
        &self,
        symbol: &str,
        kind: StatementKind,
        frequency: Frequency,
    ) -> Result<StatementTable, ProviderError> {
        let path = self.statement_path(symbol, kind, frequency);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProviderError::DataNotAvailable(format!(
                "{} {} {} ({})",
                symbol,
                kind,
                frequency,
                path.display()
            )),
            _ => ProviderError::Internal(format!("{}: {}", path.display(), e)),
        })?;

        serde_json::from_str(&content)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", path.display(), e)))
    }

    fn shares_outstanding(&self, symbol: &str) -> Option<f64> {
        self.profile(symbol)?
            .shares_outstanding
            .filter(|shares| shares.is_finite() && *shares > 0.0)
    }

    fn sector(&self, symbol: &str) -> Option<String> {
        self.profile(symbol)?
            .sector
            .filter(|sector| !sector.trim().is_empty())
    }
}
