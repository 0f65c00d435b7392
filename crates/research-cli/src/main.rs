//! Equity research pipeline CLI.
//!
//! Researches one symbol end to end: validates the ticker, cleans up prior
//! runs, then executes the research phases in dependency order, writing all
//! output under `work/{SYMBOL}_{YYYYMMDD}`. Provider credentials are read
//! from the environment (a `.env` file is honored if present):
//!
//! - `FINNHUB_API_KEY` enables Finnhub for ticker lookup and peer discovery
//! - `FMP_API_KEY` enables Financial Modeling Prep as a fallback
//!
//! Phase-level credentials (`OPENBB_PAT`, `PERPLEXITY_API_KEY`, and so on)
//! are validated before any phase starts and passed through to the phase
//! scripts unchanged.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use research::{
    Orchestrator, ProviderRegistry, RunConfig, RunSummary, Symbol, parse_phase_list,
};

#[derive(Parser)]
#[command(name = "research", about = "Run the equity research pipeline for a symbol")]
struct Cli {
    /// Ticker symbol to research (e.g., TSLA).
    symbol: String,

    /// Comma-separated phases to run, or "all".
    #[arg(long, default_value = "all")]
    phases: String,

    /// Keep prior run directories for this symbol.
    #[arg(long, default_value_t = false)]
    skip_cleanup: bool,

    /// Comma-separated peer symbols, overriding peer discovery.
    #[arg(long)]
    peers: Option<String>,

    /// Pass auto-detected peers to the technical phase unfiltered.
    #[arg(long, default_value_t = false)]
    no_filter_peers: bool,

    /// Root directory for per-run work directories.
    #[arg(long, default_value = "work")]
    work_dir: PathBuf,

    /// Directory holding the phase scripts.
    #[arg(long, default_value = "skills")]
    skills_dir: PathBuf,

    /// Maximum number of data phases running concurrently.
    #[arg(long, default_value_t = research::DEFAULT_MAX_PARALLEL)]
    max_parallel: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let phases = parse_phase_list(&cli.phases).context("invalid --phases value")?;
    let peers = cli
        .peers
        .map(|list| list.split(',').map(Symbol::new).collect::<Vec<_>>());

    let config = RunConfig {
        phases,
        skip_cleanup: cli.skip_cleanup,
        peers,
        filter_peers: !cli.no_filter_peers,
        work_root: cli.work_dir,
        skills_dir: cli.skills_dir,
        max_parallel: cli.max_parallel,
        ..RunConfig::new(Symbol::new(&cli.symbol))
    };

    let mut orchestrator = Orchestrator::new(build_registry());
    let summary = orchestrator
        .run(config)
        .await
        .with_context(|| format!("research run for {} could not start", cli.symbol))?;

    print_summary(&summary);
    std::process::exit(summary.exit_code());
}

/// Builds the provider registry from whichever credentials are present.
/// Yahoo needs no key and always participates.
fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new().with_yahoo();
    if let Ok(key) = std::env::var("FINNHUB_API_KEY") {
        registry = registry.with_finnhub(&key);
    }
    if let Ok(key) = std::env::var("FMP_API_KEY") {
        registry = registry.with_fmp(&key);
    }
    registry
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Research run for {}: {}", summary.symbol, summary.outcome);
    println!("  Work directory: {}", summary.work_dir.display());
    println!("  Completed: {}", join_or_none(&summary.completed));
    println!("  Failed:    {}", join_or_none(&summary.failed));
    if !summary.skipped.is_empty() {
        println!("  Skipped (script not installed): {}", summary.skipped.join(", "));
    }
    for error in &summary.errors {
        println!("  Error: {error}");
    }
}

fn join_or_none(phases: &[String]) -> String {
    if phases.is_empty() {
        "none".to_string()
    } else {
        phases.join(", ")
    }
}
