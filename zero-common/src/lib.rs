//! Zero Common - Shared configuration, logging and error handling for the valuation tools.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{Config, ObservabilityConfig, ValuationConfig};
pub use error::{display_chain, Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};
