//! Per-session statement cache.
//!
//! Each statement is fetched at most once per (kind, frequency) for the lifetime
//! of a session. Failed fetches are cached as empty tables so a broken source is
//! not hit again within the same session.

use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::{Frequency, StatementAccessor, StatementKind, StatementTable};

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Fetches that failed and were cached as empty tables
    pub failures: u64,
}

/// Memoized statements for one symbol.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: HashMap<(StatementKind, Frequency), StatementTable>,
    hits: u64,
    misses: u64,
    failures: u64,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached statement, fetching it from `accessor` on first use.
    pub fn get_or_fetch<A: StatementAccessor + ?Sized>(
        &mut self,
        accessor: &A,
        symbol: &str,
        kind: StatementKind,
        frequency: Frequency,
    ) -> &StatementTable {
        match self.entries.entry((kind, frequency)) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                tracing::debug!(symbol, kind = %kind, frequency = %frequency, "Statement cache hit");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                let table = match accessor.statement(symbol, kind, frequency) {
                    Ok(table) => {
                        tracing::debug!(
                            symbol,
                            kind = %kind,
                            frequency = %frequency,
                            rows = table.row_count(),
                            source = accessor.name(),
                            "Fetched statement"
                        );
                        table
                    }
                    Err(e) => {
                        self.failures += 1;
                        tracing::warn!(
                            symbol,
                            kind = %kind,
                            frequency = %frequency,
                            source = accessor.name(),
                            recoverable = e.is_recoverable(),
                            error = %e,
                            "Statement unavailable, using empty table"
                        );
                        StatementTable::empty()
                    }
                };
                entry.insert(table)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            failures: self.failures,
        }
    }
}
