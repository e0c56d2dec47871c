//! Portfolio Analytics Binary
//!
//! Reads a JSON ledger of closed trades (and optional benchmark closes),
//! runs every analytics stage and prints the report as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin portfolio-analytics -- --ledger ledger.json --config analytics.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter, overrides `observability.logging.level`
//! - Any `${VAR}` referenced from the config file

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use portfolio_analytics::config::{AnalyticsConfig, load_config};
use portfolio_analytics::report::{ReportInput, build_report};
use portfolio_analytics::telemetry::init_tracing;
use tracing::{info, warn};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic portfolio analytics report")]
struct Args {
    /// JSON ledger with `trades` and optional `benchmark` arrays.
    #[arg(short, long)]
    ledger: PathBuf,

    /// YAML config file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Write the report here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => load_config(Some(path)).with_context(|| format!("loading config {path}"))?,
        None => AnalyticsConfig::default(),
    };
    init_tracing(&config.observability.logging);

    let raw = fs::read_to_string(&args.ledger)
        .with_context(|| format!("reading ledger {}", args.ledger.display()))?;
    let input: ReportInput = serde_json::from_str(&raw)
        .with_context(|| format!("parsing ledger {}", args.ledger.display()))?;

    info!(
        trades = input.trades.len(),
        benchmark = input.benchmark.len(),
        "Ledger loaded"
    );

    let report = build_report(&input, &config).context("building report")?;
    if !report.rejected_trades.is_empty() {
        warn!(count = report.rejected_trades.len(), "Some trade rows were rejected");
    }

    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    match args.output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
