//! # Earnings Call Transcripts
//!
//! Scrapes earnings call transcripts for a list of ticker symbols from The
//! Motley Fool and emits them as JSON: one entry per ticker, each call with
//! its date, source link, and cleaned transcript lines.
//!
//! ## Usage
//!
//! ```sh
//! earnings_call_transcripts AAPL MSFT > transcripts.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: find the ticker's quote page (trying each exchange
//!    listing in turn) and collect its transcript links
//! 2. **Fetching**: download each transcript page and split it into fragments
//! 3. **Extraction**: keep only the spoken transcript lines
//! 4. **Output**: write the ticker → calls mapping as JSON

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod errors;
mod extract;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
#[cfg(test)]
mod test_server;
mod utils;

use cli::Cli;
use config::Settings;
use fetch::{HttpFetch, PageFetch, RetryFetch, build_client};
use outputs::json;
use pipeline::{RunReport, collect_transcripts};
use scrapers::fool::{Discovery, HttpSessionFactory};
use utils::{ensure_writable_dir, normalize_tickers};

/// Pick the discovery back-end and run every ticker.
async fn run<P: PageFetch>(
    settings: &Settings,
    client: reqwest::Client,
    fetcher: &P,
    tickers: &[String],
    limit: Option<usize>,
) -> Result<RunReport, Box<dyn Error>> {
    if settings.browser {
        #[cfg(feature = "browser")]
        {
            let factory = scrapers::browser::BrowserSessionFactory::new(settings)?;
            let discovery = Discovery::new(factory, settings)?;
            info!("Using headless browser for link discovery");
            return Ok(collect_transcripts(&discovery, fetcher, tickers, limit).await);
        }
        #[cfg(not(feature = "browser"))]
        tracing::warn!("Built without the `browser` feature; falling back to HTTP link discovery");
    }

    let factory = HttpSessionFactory::new(client, settings)?;
    let discovery = Discovery::new(factory, settings)?;
    Ok(collect_transcripts(&discovery, fetcher, tickers, limit).await)
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init (stderr; stdout carries the JSON) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("earnings_call_transcripts starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref())?.with_cli(&args)?;
    debug!(?settings, "Effective settings");

    // Early check: a bad output path should fail before any scraping
    if let Some(dir) = args
        .output
        .as_deref()
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
    {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let tickers = normalize_tickers(&args.tickers);
    info!(count = tickers.len(), tickers = ?tickers, "Tickers to scrape");

    let client = build_client(&settings)?;
    let fetcher = RetryFetch::new(
        HttpFetch::new(client.clone(), &settings.content_selector)?,
        settings.max_retries,
        Duration::from_millis(settings.retry_base_delay_ms),
    );

    let report = run(&settings, client, &fetcher, &tickers, args.limit).await?;

    json::write_results(&report.results, args.output.as_deref(), !args.compact).await?;

    for failure in &report.failures {
        error!(ticker = %failure.ticker, error = %failure.error, "Ticker failed");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        tickers = report.results.len(),
        failed_tickers = report.failures.len(),
        calls = report.results.total_calls(),
        empty_calls = report.empty_calls(),
        "Execution complete"
    );

    if report.results.is_empty() && !report.failures.is_empty() {
        return Err("no ticker could be discovered".into());
    }
    Ok(())
}
