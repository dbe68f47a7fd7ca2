//! Configuration management for the valuation service.
//!
//! Configuration lives at `~/.codecoder/valuation.json`. A missing file is not an
//! error: every field has a default.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ZERO_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_VALUATION_DATA_DIR` → valuation.data_dir
//! - `ZERO_VALUATION_PEERS` → valuation.sector_peers_path
//! - `ZERO_LOG_LEVEL` → observability.log_level
//! - `ZERO_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new()
        .map_or_else(
            || PathBuf::from(".codecoder"),
            |dirs| dirs.home_dir().join(".codecoder"),
        )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("valuation.json")
}

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Valuation data sources and defaults
    #[serde(default)]
    pub valuation: ValuationConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("ZERO_VALUATION_DATA_DIR") {
            self.valuation.data_dir = Some(dir);
        }
        if let Ok(path) = std::env::var("ZERO_VALUATION_PEERS") {
            self.valuation.sector_peers_path = Some(path);
        }
        if let Ok(level) = std::env::var("ZERO_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("ZERO_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Aliases: "level" for backward compatibility with existing config files
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    /// Aliases: "format" for backward compatibility with existing config files
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Valuation Configuration
// ============================================================================

/// Shares outstanding assumed when no source reports a figure.
pub const DEFAULT_SHARES_OUTSTANDING: f64 = 1_000_000_000.0;

/// Valuation data sources and session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Root directory of per-symbol statement files
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Sector peer statistics file (produced by the peer refresh job)
    #[serde(default)]
    pub sector_peers_path: Option<String>,

    /// Statement frequency used when the assumption set does not name one
    #[serde(default = "default_frequency")]
    pub default_frequency: String,

    /// Shares outstanding used when neither the data source nor the input reports one
    #[serde(default = "default_shares_outstanding")]
    pub default_shares_outstanding: f64,
}

fn default_frequency() -> String {
    "year".into()
}

fn default_shares_outstanding() -> f64 {
    DEFAULT_SHARES_OUTSTANDING
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            sector_peers_path: None,
            default_frequency: default_frequency(),
            default_shares_outstanding: default_shares_outstanding(),
        }
    }
}

impl ValuationConfig {
    /// Statement directory with `~` and variables expanded.
    pub fn data_dir_path(&self) -> Option<PathBuf> {
        self.data_dir.as_deref().map(expand_path)
    }

    /// Sector peer file with `~` and variables expanded.
    pub fn sector_peers_file(&self) -> Option<PathBuf> {
        self.sector_peers_path.as_deref().map(expand_path)
    }
}
