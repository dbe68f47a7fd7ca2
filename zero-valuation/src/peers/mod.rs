//! Sector peer statistics.
//!
//! The comparable-multiple models price a company at the median P/E and P/B of
//! the largest listed companies in its sector. Statistics come from a
//! [`PeerStatisticsProvider`]; [`SectorPeerStore`] is the file-backed one.

pub mod store;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use store::{SectorPeerStore, SECTOR_ALIASES};

/// How a sector label was matched against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorMatch {
    /// Label is a store key
    Exact,
    /// Label mapped through the curated alias table
    Alias,
    /// Label and a store key contain one another
    Substring,
}

/// One peer company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub symbol: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub pb_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Peer multiples for one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerStatistics {
    /// Store key the label resolved to
    pub sector: String,
    pub median_pe: Option<f64>,
    pub median_pb: Option<f64>,
    pub peers: Vec<Peer>,
    pub peer_count: usize,
    pub total_in_sector: u32,
    pub matched_by: SectorMatch,
}

impl PeerStatistics {
    /// Median P/E when it is a usable multiple.
    pub fn usable_pe(&self) -> Option<f64> {
        self.median_pe.filter(|pe| pe.is_finite() && *pe > 0.0)
    }

    /// Median P/B when it is a usable multiple.
    pub fn usable_pb(&self) -> Option<f64> {
        self.median_pb.filter(|pb| pb.is_finite() && *pb > 0.0)
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.peers.iter().map(|p| p.symbol.as_str()).collect()
    }
}

/// Source of sector peer multiples.
pub trait PeerStatisticsProvider {
    /// Statistics for a sector label, or `None` when no sector matches.
    fn peer_statistics(&self, sector: &str) -> Option<PeerStatistics>;
}

impl<T: PeerStatisticsProvider + ?Sized> PeerStatisticsProvider for Arc<T> {
    fn peer_statistics(&self, sector: &str) -> Option<PeerStatistics> {
        (**self).peer_statistics(sector)
    }
}
