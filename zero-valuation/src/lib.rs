//! Zero Valuation Library
//!
//! Per-share fair value for a listed company from its financial statements,
//! analyst assumptions and sector peer multiples.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          ValuationSession                            │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  StatementAccessor ──▶ StatementCache ──▶ normalize ──▶ resolve      │
//! │                                                           │          │
//! │                                                           ▼          │
//! │  PeerStatisticsProvider ─────────────────────▶ ValuationEngine       │
//! │                                               (FCFE, FCFF, P/E, P/B) │
//! │                                                   │          │       │
//! │                                                   ▼          ▼       │
//! │                                     SensitivityAnalyzer   aggregate  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Statements
//! - Raw tables arrive in the split layout with unsorted period rows
//! - The latest annual row or the four latest quarters are kept
//! - Line items are looked up through ordered English/Vietnamese alias tables
//!
//! ## Degradation
//! - Missing data resolves to zero
//! - A model that cannot run reports a degraded result worth zero
//! - An unknown sector falls back to market multiples (15× P/E, 1.5× P/B)

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod peers;
pub mod session;
pub mod statement;
pub mod valuation;

pub use peers::{PeerStatistics, PeerStatisticsProvider, SectorPeerStore};
pub use session::{SessionBuilder, ValuationSession};
pub use statement::{
    Frequency, JsonStatementAccessor, ProviderError, StatementAccessor, StatementKind,
    StatementTable,
};
pub use valuation::{
    AssumptionSet, FinancialSnapshot, ModelKind, ModelResult, ModelStatus, ValuationEngine,
    ValuationReport,
};
