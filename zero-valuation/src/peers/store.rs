//! File-backed sector peer store.
//!
//! Loads the `sector_peers.json` snapshot written by the peer refresh job:
//!
//! ```json
//! {"Ngân hàng": {"median_pe": 8.9, "median_pb": 1.4, "peer_count": 10,
//!                "total_in_sector": 27, "peers": [{"symbol": "VCB", ...}]}}
//! ```
//!
//! Lookup order: exact key, curated alias, substring containment, not found.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use zero_common::{Error, Result, ResultExt};

use super::{Peer, PeerStatistics, PeerStatisticsProvider, SectorMatch};

/// Fine-grained sector labels and the coarser store key they belong to.
pub const SECTOR_ALIASES: &[(&str, &str)] = &[
    ("Ngân hàng thương mại", "Ngân hàng"),
    ("Banks", "Ngân hàng"),
    ("Banking", "Ngân hàng"),
    ("Bảo hiểm nhân thọ", "Bảo hiểm"),
    ("Bảo hiểm phi nhân thọ", "Bảo hiểm"),
    ("Insurance", "Bảo hiểm"),
    ("Môi giới chứng khoán", "Dịch vụ tài chính"),
    ("Financial Services", "Dịch vụ tài chính"),
    ("Real Estate", "Bất động sản"),
    ("Phát triển bất động sản", "Bất động sản"),
    ("Thép", "Tài nguyên Cơ bản"),
    ("Kim loại", "Tài nguyên Cơ bản"),
    ("Basic Resources", "Tài nguyên Cơ bản"),
    ("Điện", "Điện, nước & xăng dầu khí đốt"),
    ("Utilities", "Điện, nước & xăng dầu khí đốt"),
    ("Phần mềm", "Công nghệ Thông tin"),
    ("Technology", "Công nghệ Thông tin"),
    ("Retail", "Bán lẻ"),
    ("Thực phẩm", "Thực phẩm và đồ uống"),
    ("Đồ uống", "Thực phẩm và đồ uống"),
    ("Food & Beverage", "Thực phẩm và đồ uống"),
    ("Xây dựng", "Xây dựng và Vật liệu"),
    ("Construction & Materials", "Xây dựng và Vật liệu"),
    ("Chemicals", "Hóa chất"),
    ("Oil & Gas", "Dầu khí"),
    ("Sản xuất dầu khí", "Dầu khí"),
];

#[derive(Debug, Clone, Deserialize)]
struct SectorEntry {
    #[serde(default)]
    median_pe: Option<f64>,
    #[serde(default)]
    median_pb: Option<f64>,
    #[serde(default)]
    peer_count: Option<usize>,
    #[serde(default)]
    total_in_sector: u32,
    #[serde(default)]
    peers: Vec<Peer>,
}

/// In-memory sector peer statistics keyed by sector label.
#[derive(Debug, Clone, Default)]
pub struct SectorPeerStore {
    sectors: BTreeMap<String, SectorEntry>,
}

impl SectorPeerStore {
    /// Load a peer snapshot from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("sector peer file {}", path.display()))
            } else {
                Error::from(e).with_context(format!("reading {}", path.display()))
            }
        })?;
        let store = Self::from_json(&content).context(format!("parsing {}", path.display()))?;
        tracing::info!(path = %path.display(), sectors = store.len(), "Loaded sector peers");
        Ok(store)
    }

    /// Load a peer snapshot, or `None` with a warning when it cannot be read.
    ///
    /// Callers then value without sector multiples and the market fallback applies.
    pub fn load_or_warn(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Sector peers unavailable, using market multiples"
                );
                None
            }
        }
    }

    /// Parse a peer snapshot.
    pub fn from_json(content: &str) -> Result<Self> {
        let sectors: BTreeMap<String, SectorEntry> = serde_json::from_str(content)?;
        Ok(Self { sectors })
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn sectors(&self) -> impl Iterator<Item = &str> {
        self.sectors.keys().map(String::as_str)
    }

    /// Resolve a label to a store key.
    pub fn resolve_sector(&self, label: &str) -> Option<(&str, SectorMatch)> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        if let Some((key, _)) = self.sectors.get_key_value(label) {
            return Some((key.as_str(), SectorMatch::Exact));
        }

        let folded = label.to_lowercase();
        for (fine, coarse) in SECTOR_ALIASES {
            if fine.to_lowercase() == folded {
                if let Some((key, _)) = self.sectors.get_key_value(*coarse) {
                    return Some((key.as_str(), SectorMatch::Alias));
                }
            }
        }

        self.sectors
            .keys()
            .find(|key| {
                let key = key.to_lowercase();
                key.contains(&folded) || folded.contains(&key)
            })
            .map(|key| (key.as_str(), SectorMatch::Substring))
    }
}

impl PeerStatisticsProvider for SectorPeerStore {
    fn peer_statistics(&self, sector: &str) -> Option<PeerStatistics> {
        let Some((key, matched_by)) = self.resolve_sector(sector) else {
            tracing::debug!(sector, "No peer statistics for sector");
            return None;
        };
        let entry = self.sectors.get(key)?;
        if matched_by != SectorMatch::Exact {
            tracing::debug!(sector, resolved = key, matched_by = ?matched_by, "Sector resolved");
        }

        Some(PeerStatistics {
            sector: key.to_string(),
            median_pe: entry.median_pe,
            median_pb: entry.median_pb,
            peers: entry.peers.clone(),
            peer_count: entry.peer_count.unwrap_or(entry.peers.len()),
            total_in_sector: entry.total_in_sector,
            matched_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "Ngân hàng": {
            "median_pe": 8.9, "median_pb": 1.42, "peer_count": 2, "total_in_sector": 27,
            "peers": [
                {"symbol": "VCB", "market_cap": 480000, "pe_ratio": 15.1, "pb_ratio": 2.6},
                {"symbol": "BID", "market_cap": 250000, "pe_ratio": 11.0, "pb_ratio": 1.9, "name": "BIDV"}
            ]
        },
        "Bảo hiểm": {"median_pe": 14.0, "median_pb": 1.3, "peer_count": 0, "total_in_sector": 9, "peers": []},
        "Tài nguyên Cơ bản": {"median_pe": 11.2, "median_pb": 1.1, "total_in_sector": 40, "peers": []},
        "Điện, nước & xăng dầu khí đốt": {"median_pe": 12.5, "median_pb": 1.6, "total_in_sector": 60, "peers": []}
    }"#;

    fn store() -> SectorPeerStore {
        SectorPeerStore::from_json(SNAPSHOT).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let stats = store().peer_statistics("Ngân hàng").unwrap();
        assert_eq!(stats.matched_by, SectorMatch::Exact);
        assert_eq!(stats.median_pe, Some(8.9));
        assert_eq!(stats.symbols(), vec!["VCB", "BID"]);
        assert_eq!(stats.peer_count, 2);
        assert_eq!(stats.total_in_sector, 27);
    }

    #[test]
    fn test_alias_pairs_resolve() {
        let store = store();
        for (label, expected) in [
            ("Ngân hàng thương mại", "Ngân hàng"),
            ("banks", "Ngân hàng"),
            ("Bảo hiểm nhân thọ", "Bảo hiểm"),
            ("Thép", "Tài nguyên Cơ bản"),
            ("Điện", "Điện, nước & xăng dầu khí đốt"),
        ] {
            let stats = store.peer_statistics(label).unwrap();
            assert_eq!(stats.sector, expected, "label {label}");
            assert_eq!(stats.matched_by, SectorMatch::Alias, "label {label}");
        }
    }

    #[test]
    fn test_substring_match_is_heuristic() {
        let store = store();
        // Label contains a store key
        let stats = store.peer_statistics("Ngân hàng đầu tư").unwrap();
        assert_eq!(stats.sector, "Ngân hàng");
        assert_eq!(stats.matched_by, SectorMatch::Substring);

        // Store key contains the label: a loose label can land on an unrelated sector
        let stats = store.peer_statistics("nước").unwrap();
        assert_eq!(stats.sector, "Điện, nước & xăng dầu khí đốt");
        assert_eq!(stats.matched_by, SectorMatch::Substring);
    }

    #[test]
    fn test_alias_precedes_substring() {
        // "Điện" is also a substring of the utilities key; the alias wins first
        let stats = store().peer_statistics("Điện").unwrap();
        assert_eq!(stats.matched_by, SectorMatch::Alias);
    }

    #[test]
    fn test_not_found() {
        let store = store();
        assert!(store.peer_statistics("Hàng không").is_none());
        assert!(store.peer_statistics("   ").is_none());
    }

    #[test]
    fn test_peer_count_defaults_to_peer_list() {
        let stats = store().peer_statistics("Tài nguyên Cơ bản").unwrap();
        assert_eq!(stats.peer_count, 0);
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = SectorPeerStore::load(&tmp.path().join("sector_peers.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sector_peers.json");
        fs::write(&path, SNAPSHOT).unwrap();
        let store = SectorPeerStore::load(&path).unwrap();
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_load_or_warn_tolerates_bad_files() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(SectorPeerStore::load_or_warn(&tmp.path().join("absent.json")).is_none());

        let malformed = tmp.path().join("malformed.json");
        fs::write(&malformed, "{\"Ngân hàng\": [").unwrap();
        assert!(SectorPeerStore::load_or_warn(&malformed).is_none());

        let valid = tmp.path().join("sector_peers.json");
        fs::write(&valid, SNAPSHOT).unwrap();
        let store = SectorPeerStore::load_or_warn(&valid).unwrap();
        assert!(!store.is_empty());
        assert_eq!(store.sectors().count(), 4);
    }
}
