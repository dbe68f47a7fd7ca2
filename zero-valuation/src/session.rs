//! Valuation session.
//!
//! A session values one company. It owns the statement cache, so every
//! (statement kind, frequency) pair is fetched at most once however many times
//! [`ValuationSession::run`] is called, and nothing is shared with other
//! sessions.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use zero_common::config::DEFAULT_SHARES_OUTSTANDING;
use zero_common::{Error, Result};

use crate::peers::{PeerStatistics, PeerStatisticsProvider};
use crate::statement::{
    normalize, CacheStats, Frequency, NormalizedStatement, StatementAccessor, StatementCache,
    StatementKind,
};
use crate::valuation::{
    aggregate, AssumptionSet, FinancialInputs, FinancialSnapshot, ModelKind, ModelResult,
    SensitivityAnalyzer, ValuationEngine, ValuationReport,
};

struct StatementSource {
    symbol: String,
    accessor: Arc<dyn StatementAccessor>,
}

// ============================================================================
// Builder
// ============================================================================

/// Configures a [`ValuationSession`].
#[derive(Default)]
pub struct SessionBuilder {
    statements: Option<(String, Arc<dyn StatementAccessor>)>,
    snapshot: Option<FinancialSnapshot>,
    sector: Option<String>,
    peers: Option<Arc<dyn PeerStatisticsProvider>>,
    engine: Option<ValuationEngine>,
    default_shares: Option<f64>,
}

impl SessionBuilder {
    /// Read statements for `symbol` from `accessor`.
    pub fn with_statements(
        mut self,
        symbol: impl Into<String>,
        accessor: Arc<dyn StatementAccessor>,
    ) -> Self {
        self.statements = Some((symbol.into(), accessor));
        self
    }

    /// Directly supplied figures. Used for line items only when no statements
    /// are configured; always consulted for shares and sector.
    pub fn with_snapshot(mut self, snapshot: FinancialSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Sector label, overriding the accessor and snapshot.
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_peers(mut self, peers: Arc<dyn PeerStatisticsProvider>) -> Self {
        self.peers = Some(peers);
        self
    }

    pub fn with_engine(mut self, engine: ValuationEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Share count used when neither the accessor nor the snapshot knows it.
    pub fn with_default_shares(mut self, shares: f64) -> Self {
        self.default_shares = Some(shares);
        self
    }

    /// Build the session.
    ///
    /// Fails with [`Error::InvalidInput`] when there is neither a symbol to
    /// read statements for nor a snapshot.
    pub fn build(self) -> Result<ValuationSession> {
        let statements = match self.statements {
            Some((symbol, accessor)) => {
                let symbol = symbol.trim().to_string();
                if symbol.is_empty() {
                    return Err(Error::InvalidInput("symbol must not be empty".into()));
                }
                Some(StatementSource { symbol, accessor })
            }
            None => None,
        };
        if statements.is_none() && self.snapshot.is_none() {
            return Err(Error::InvalidInput(
                "a symbol or directly supplied financial data is required".into(),
            ));
        }

        let sector = self
            .sector
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                statements
                    .as_ref()
                    .and_then(|s| s.accessor.sector(&s.symbol))
            })
            .or_else(|| self.snapshot.as_ref().and_then(|s| s.sector.clone()));

        let session = ValuationSession {
            id: Uuid::new_v4(),
            statements,
            snapshot: self.snapshot,
            sector,
            peers: self.peers,
            engine: self.engine.unwrap_or_default(),
            analyzer: SensitivityAnalyzer::new(),
            cache: StatementCache::new(),
            default_shares: self.default_shares.unwrap_or(DEFAULT_SHARES_OUTSTANDING),
            shares: None,
        };

        tracing::debug!(
            session_id = %session.id,
            symbol = session.symbol().unwrap_or("-"),
            sector = session.sector.as_deref().unwrap_or("-"),
            "Valuation session created"
        );
        Ok(session)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Valuation of one company.
pub struct ValuationSession {
    id: Uuid,
    statements: Option<StatementSource>,
    snapshot: Option<FinancialSnapshot>,
    sector: Option<String>,
    peers: Option<Arc<dyn PeerStatisticsProvider>>,
    engine: ValuationEngine,
    analyzer: SensitivityAnalyzer,
    cache: StatementCache,
    default_shares: f64,
    shares: Option<f64>,
}

impl ValuationSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol(&self) -> Option<&str> {
        self.statements.as_ref().map(|s| s.symbol.as_str())
    }

    /// Resolved sector label, if any.
    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Shares outstanding, resolved once per session.
    pub fn shares_outstanding(&mut self) -> f64 {
        if let Some(shares) = self.shares {
            return shares;
        }
        let shares = self
            .statements
            .as_ref()
            .and_then(|s| s.accessor.shares_outstanding(&s.symbol))
            .or_else(|| self.snapshot.as_ref().and_then(|s| s.shares_outstanding))
            .unwrap_or_else(|| {
                tracing::debug!(
                    default = self.default_shares,
                    "Shares outstanding unknown, using default"
                );
                self.default_shares
            });
        self.shares = Some(shares);
        shares
    }

    /// Resolved model inputs for a statement frequency.
    pub fn inputs(&mut self, frequency: Frequency) -> FinancialInputs {
        match (&self.statements, &self.snapshot) {
            (Some(source), _) => {
                let income =
                    fetch_normalized(&mut self.cache, source, StatementKind::Income, frequency);
                let cash_flow =
                    fetch_normalized(&mut self.cache, source, StatementKind::CashFlow, frequency);
                let balance =
                    fetch_normalized(&mut self.cache, source, StatementKind::Balance, frequency);
                FinancialInputs::from_statements(&income, &cash_flow, &balance)
            }
            (None, Some(snapshot)) => FinancialInputs::from_snapshot(snapshot, frequency),
            // build() guarantees one of the two
            (None, None) => FinancialInputs::from_snapshot(&FinancialSnapshot::default(), frequency),
        }
    }

    /// Peer multiples for the session's sector.
    pub fn peer_statistics(&self) -> Option<PeerStatistics> {
        let sector = self.sector.as_deref()?;
        let stats = self.peers.as_ref()?.peer_statistics(sector);
        if stats.is_none() {
            tracing::info!(sector, "Sector not found, using market multiples");
        }
        stats
    }

    /// Run a single model.
    pub fn model(&mut self, kind: ModelKind, assumptions: &AssumptionSet) -> ModelResult {
        let inputs = self.inputs(assumptions.frequency());
        let shares = self.shares_outstanding();
        let peers = match kind {
            ModelKind::JustifiedPe | ModelKind::JustifiedPb => self.peer_statistics(),
            ModelKind::Fcfe | ModelKind::Fcff => None,
        };
        self.engine
            .run(kind, &inputs, shares, assumptions, peers.as_ref())
    }

    /// Run all four models, the sensitivity grid and the weighted average.
    pub fn run(&mut self, assumptions: &AssumptionSet) -> ValuationReport {
        let span = tracing::info_span!(
            "valuation",
            session_id = %self.id,
            symbol = self.symbol().unwrap_or("-")
        );
        let _guard = span.enter();

        let inputs = self.inputs(assumptions.frequency());
        let shares = self.shares_outstanding();
        let peers = self.peer_statistics();

        let [fcfe, fcff, justified_pe, justified_pb] = ModelKind::ALL
            .map(|kind| self.engine.run(kind, &inputs, shares, assumptions, peers.as_ref()));

        let sensitivity = match self.analyzer.analyze(&self.engine, &inputs, shares, assumptions) {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                tracing::warn!(error = %e, "Sensitivity analysis skipped");
                None
            }
        };

        let blended = aggregate(
            &[&fcfe, &fcff, &justified_pe, &justified_pb],
            &assumptions.model_weights,
        );

        tracing::info!(
            frequency = %inputs.frequency,
            shares_outstanding = shares,
            fcfe = fcfe.share_value,
            fcff = fcff.share_value,
            justified_pe = justified_pe.share_value,
            justified_pb = justified_pb.share_value,
            weighted_average = blended.weighted_average,
            models_used = blended.summary.as_ref().map_or(0, |s| s.models_used),
            "Valuation complete"
        );

        ValuationReport {
            symbol: self.symbol().map(str::to_string),
            session_id: self.id,
            frequency: inputs.frequency,
            shares_outstanding: shares,
            fcfe,
            fcff,
            justified_pe,
            justified_pb,
            weighted_average: blended.weighted_average,
            summary: blended.summary,
            sensitivity_analysis: sensitivity,
            sector_peers: peers,
            generated_at: Utc::now(),
        }
    }
}

fn fetch_normalized(
    cache: &mut StatementCache,
    source: &StatementSource,
    kind: StatementKind,
    frequency: Frequency,
) -> NormalizedStatement {
    let table = cache.get_or_fetch(source.accessor.as_ref(), &source.symbol, kind, frequency);
    normalize(table, frequency)
}
