//! Zero Valuation - Equity fair-value command line for the Zero ecosystem.
//!
//! Values a listed company with FCFE, FCFF, justified P/E and justified P/B
//! models and prints the report as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zero_common::config::Config;
use zero_common::logging::init_logging;
use zero_common::Validate;
use zero_valuation::peers::PeerStatisticsProvider;
use zero_valuation::{
    AssumptionSet, FinancialSnapshot, Frequency, JsonStatementAccessor, SectorPeerStore,
    ValuationSession,
};

#[derive(Parser, Debug)]
#[command(name = "zero-valuation")]
#[command(author = "theonlyhennygod")]
#[command(version)]
#[command(about = "Equity fair value from statements, assumptions and sector peers.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Value one company and print the JSON report
    Analyze {
        /// Ticker symbol (statements are read from the data directory)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Statement directory (default: valuation.data_dir from config)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Sector label used for peer multiples
        #[arg(long)]
        sector: Option<String>,

        /// Assumption set JSON file
        #[arg(short, long)]
        assumptions: Option<PathBuf>,

        /// Statement frequency (year, quarter)
        #[arg(short, long)]
        frequency: Option<Frequency>,

        /// Directly supplied financial figures JSON file
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Sector peer statistics file (default: valuation.sector_peers_path from config)
        #[arg(long)]
        peers: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Show the peer statistics a sector label resolves to
    Peers {
        /// Sector label
        sector: String,

        /// Sector peer statistics file (default: valuation.sector_peers_path from config)
        #[arg(long)]
        peers: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", zero_common::display_chain(&*e));
        let code = e
            .downcast_ref::<zero_common::Error>()
            .map_or(1, zero_common::Error::exit_code);
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    config.validate().context("Invalid configuration")?;
    tracing::debug!("Zero Valuation v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze {
            symbol,
            data_dir,
            sector,
            assumptions,
            frequency,
            snapshot,
            peers,
            pretty,
        } => {
            let mut assumption_set = match assumptions {
                Some(path) => read_json::<AssumptionSet>(&path)?,
                None => AssumptionSet::default(),
            };
            if frequency.is_some() {
                assumption_set.data_frequency = frequency;
            }
            let default_frequency: Frequency = config
                .valuation
                .default_frequency
                .parse()
                .map_err(anyhow::Error::msg)?;
            let assumption_set = assumption_set.with_default_frequency(default_frequency);
            assumption_set.validate().context("Invalid assumptions")?;

            let mut builder = ValuationSession::builder()
                .with_default_shares(config.valuation.default_shares_outstanding);

            if let Some(symbol) = symbol {
                let root = data_dir
                    .or_else(|| config.valuation.data_dir_path())
                    .unwrap_or_else(|| PathBuf::from("."));
                tracing::debug!(root = %root.display(), "Reading statements");
                builder =
                    builder.with_statements(symbol, Arc::new(JsonStatementAccessor::new(root)));
            }
            if let Some(path) = snapshot {
                builder = builder.with_snapshot(read_json::<FinancialSnapshot>(&path)?);
            }
            if let Some(sector) = sector {
                builder = builder.with_sector(sector);
            }
            // A missing or unreadable peer file only costs the sector multiples
            let store = peers_path(peers, &config)
                .and_then(|path| SectorPeerStore::load_or_warn(&path));
            if let Some(store) = store {
                builder = builder.with_peers(Arc::new(store));
            }

            let mut session = builder.build()?;
            let report = session.run(&assumption_set);

            let output = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{output}");
        }

        Commands::Peers { sector, peers } => {
            let path = peers_path(peers, &config).ok_or_else(|| {
                zero_common::Error::Config(
                    "no sector peer file (use --peers or valuation.sector_peers_path)".into(),
                )
            })?;
            let store = SectorPeerStore::load(&path)?;
            match store.peer_statistics(&sector) {
                Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                None => {
                    println!("No peer statistics for sector '{sector}'");
                    println!("Known sectors: {}", store.sectors().collect::<Vec<_>>().join(", "));
                }
            }
        }
    }

    Ok(())
}

/// Peer file from the flag or the configured path.
fn peers_path(flag: Option<PathBuf>, config: &Config) -> Option<PathBuf> {
    flag.or_else(|| config.valuation.sector_peers_file())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
