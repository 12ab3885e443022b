//! JSON output of the scraped transcripts.
//!
//! Results go to stdout by default so the tool composes with `jq` and
//! friends; logs are on stderr. With `--output` the JSON is written to a
//! file instead, creating parent directories as needed.

use crate::models::TickerResults;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

/// Serialize `results`, pretty-printed unless `pretty` is false.
pub fn render(results: &TickerResults, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(results)
    } else {
        serde_json::to_string(results)
    }
}

/// Write `results` to `output`, or to stdout when no path is given.
///
/// # Arguments
///
/// * `results` - Ticker → calls mapping to serialize
/// * `output` - Target file; parent directories are created when missing
/// * `pretty` - Indent the JSON (the default unless `--compact` is passed)
///
/// # Returns
///
/// `Ok(())` once the JSON is written; an error if serialization, directory
/// creation, or the file/stdout write fails.
#[instrument(level = "info", skip(results))]
pub async fn write_results(
    results: &TickerResults,
    output: Option<&Path>,
    pretty: bool,
) -> Result<(), Box<dyn Error>> {
    let mut json = render(results, pretty)?;
    json.push('\n');

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = fs::create_dir_all(parent).await {
                    error!(dir = %parent.display(), error = %e, "Failed to create output dir");
                    return Err(e.into());
                }
            }
            fs::write(path, json).await?;
            info!(
                path = %path.display(),
                tickers = results.len(),
                calls = results.total_calls(),
                "Wrote transcripts JSON"
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(json.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
