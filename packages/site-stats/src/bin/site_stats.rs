//! site-stats CLI
//!
//! Reads URLs from a CSV table and writes one enriched row per URL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use site_stats::types::config::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use site_stats::{
    prepare, EnrichConfig, HttpFetcherFactory, LookupClient, Scheduler, DEFAULT_LOOKUP_ENDPOINT,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "site-stats")]
#[command(about = "Enrich a CSV of website URLs with titles, redirects and ranking stats")]
struct Cli {
    /// CSV table with website addresses
    #[arg(short, long, env = "SITE_STATS_INPUT")]
    input: PathBuf,

    /// Result table (overwritten if present)
    #[arg(short, long, env = "SITE_STATS_OUTPUT", default_value = "result.csv")]
    output: PathBuf,

    /// Column holding the web address (0-based)
    #[arg(long, env = "SITE_STATS_URL_COLUMN")]
    url_column: usize,

    /// First row to process (0-based); use to skip a header or resume
    #[arg(long, env = "SITE_STATS_FIRST_ROW", default_value_t = 0)]
    first_row: usize,

    /// Rows processed at the same time (1-100)
    #[arg(short, long, env = "SITE_STATS_WORKERS", default_value_t = 1)]
    workers: usize,

    /// Seconds before a request is abandoned
    #[arg(long, env = "SITE_STATS_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Write a header line before the results
    #[arg(long)]
    header: bool,

    /// Treat a `Link: rel=canonical` response header as a redirect
    #[arg(long)]
    canonical_fallback: bool,

    /// Lookup service query prefix
    #[arg(long, env = "SITE_STATS_LOOKUP_ENDPOINT", default_value = DEFAULT_LOOKUP_ENDPOINT)]
    lookup_endpoint: String,

    /// User-Agent sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

impl Cli {
    fn into_config(self) -> EnrichConfig {
        EnrichConfig::new(self.input, self.output)
            .with_url_column(self.url_column)
            .with_first_row(self.first_row)
            .with_workers(self.workers)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_header(self.header)
            .with_canonical_fallback(self.canonical_fallback)
            .with_lookup_endpoint(self.lookup_endpoint)
            .with_user_agent(self.user_agent)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed flags
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,site_stats=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = Cli::parse().into_config();

    tracing::info!(
        input = %config.input.display(),
        output = %config.output.display(),
        url_column = config.url_column,
        first_row = config.first_row,
        workers = config.workers,
        timeout_secs = config.timeout.as_secs(),
        "Starting site-stats"
    );

    let (rows, sink) = prepare(&config).context("Failed to prepare run")?;

    let scheduler = Scheduler::new(
        config.worker_options(),
        HttpFetcherFactory::from_config(&config),
        LookupClient::new(config.lookup_endpoint.clone()),
        Arc::new(sink),
    );
    let summary = scheduler.run(rows).await;

    if !summary.is_complete() {
        bail!(
            "{} of {} rows were not written to {}",
            summary.rows_dispatched - summary.rows_written,
            summary.rows_dispatched,
            config.output.display()
        );
    }

    tracing::info!(
        rows = summary.rows_written,
        output = %config.output.display(),
        "Done"
    );
    Ok(())
}
