//! sitelens entry point.
//!
//! Reads parsed location records, enriches each with web search context and
//! nearby federal contract activity, and writes the summaries as JSON.
//! Logging goes to stderr so stdout carries only the enrichment output.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sitelens_core::AppConfig;
use sitelens_pipeline::{LocationSummary, StageStatus};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod input;
mod setup;

#[derive(Debug, Parser)]
#[command(name = "sitelens", version, about = "Enrich named map locations with web and contract context")]
struct Args {
    /// JSON file of location records.
    #[arg(long, short = 'i', value_name = "FILE")]
    input: PathBuf,

    /// Write summaries here instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Process at most this many locations.
    #[arg(long)]
    max_places: Option<usize>,

    /// Search results kept per location.
    #[arg(long)]
    max_results: Option<usize>,

    /// Contract search radius in miles.
    #[arg(long)]
    radius_miles: Option<f64>,

    /// Ignore cached entries and refresh them.
    #[arg(long)]
    bust_cache: bool,

    /// Skip the web search stage.
    #[arg(long)]
    skip_search: bool,

    /// Skip the contract search stage.
    #[arg(long)]
    skip_contracts: bool,

    /// Locations enriched concurrently.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Debug-level logging.
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(max_results) = self.max_results {
            config.max_results = max_results;
        }
        if let Some(radius) = self.radius_miles {
            config.search_radius_miles = radius;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.bust_cache {
            config.bust_cache = true;
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
}

async fn write_output(summaries: &[LocationSummary], output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(summaries)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("wrote {} summaries to {}", summaries.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config = AppConfig::load()?;
    args.apply(&mut config);
    config.validate()?;

    let stages = setup::Stages { search: !args.skip_search, contracts: !args.skip_contracts };
    let enricher = setup::build_enricher(&config, stages).await?;
    let records = input::load_locations(&args.input, args.max_places).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing without further provider calls");
            on_signal.cancel();
        }
    });

    let summaries = enricher.enrich_all(records, &cancel).await;

    let degraded = summaries
        .iter()
        .filter(|s| {
            [s.search.status, s.contracts.status]
                .iter()
                .any(|status| !status.is_success() && *status != StageStatus::Skipped)
        })
        .count();
    tracing::info!("enriched {} locations ({} degraded)", summaries.len(), degraded);

    write_output(&summaries, args.output.as_ref()).await
}
