//! Command-line interface definitions.
//!
//! Flags override values from the optional YAML config file; see
//! [`crate::config::Settings`].

use clap::Parser;
use std::path::PathBuf;

/// Scrape earnings call transcripts for one or more ticker symbols.
///
/// # Examples
///
/// ```sh
/// # Print AAPL and MSFT transcripts as JSON on stdout
/// earnings_call_transcripts AAPL MSFT
///
/// # Write to a file, only the four most recent calls per ticker
/// earnings_call_transcripts -o out/transcripts.json --limit 4 KO
///
/// # Look the ticker up on NYSE first
/// earnings_call_transcripts --exchanges nyse,nasdaq KO
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Ticker symbols to scrape (e.g. AAPL MSFT)
    #[arg(required = true)]
    pub tickers: Vec<String>,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exchange listings to try, in order (comma separated)
    #[arg(long, env = "TRANSCRIPT_EXCHANGES", value_delimiter = ',')]
    pub exchanges: Option<Vec<String>>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries for a failed transcript page fetch
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Only process the N most recent calls per ticker
    #[arg(long)]
    pub limit: Option<usize>,

    /// Discover links with a headless browser (requires the `browser` feature)
    #[arg(long)]
    pub browser: bool,

    /// Emit single-line JSON instead of pretty-printed output
    #[arg(long)]
    pub compact: bool,
}
