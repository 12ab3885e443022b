//! Small helpers used across the pipeline.
//!
//! - String truncation for log previews
//! - Call date extraction from transcript link paths
//! - Ticker normalization
//! - File system validation for the output location

use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Matches the `/YYYY/MM/DD/` segment every transcript URL carries.
static DATE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4})/(\d{2})/(\d{2})/").expect("static date regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Pull the call date out of a transcript link.
///
/// The site files transcripts under `/earnings/call-transcripts/YYYY/MM/DD/...`.
/// Returns the date as an ISO `YYYY-MM-DD` string, or `None` when the link has
/// no such segment or the segment is not a real calendar date.
pub fn date_from_link(link: &str) -> Option<String> {
    let caps = DATE_SEGMENT.captures(link)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Trim, upper-case and de-duplicate ticker symbols, keeping first-seen order.
pub fn normalize_tickers<S: AsRef<str>>(tickers: &[S]) -> Vec<String> {
    tickers
        .iter()
        .map(|t| t.as_ref().trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then writes and removes a probe
/// file so a bad output path fails before any scraping starts.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("…(+18 bytes)"));
    }

    #[test]
    fn test_date_from_link() {
        assert_eq!(
            date_from_link(
                "https://www.fool.com/earnings/call-transcripts/2025/07/31/apple-aapl-q3-2025-earnings-call-transcript/"
            ),
            Some("2025-07-31".to_string())
        );
        assert_eq!(
            date_from_link("/earnings/call-transcripts/2024/01/05/x/"),
            Some("2024-01-05".to_string())
        );
    }

    #[test]
    fn test_date_from_link_rejects_missing_or_bad_dates() {
        assert_eq!(date_from_link("https://www.fool.com/quote/nasdaq/aapl/"), None);
        assert_eq!(date_from_link("/earnings/call-transcripts/2024/13/40/x/"), None);
        // the segment must be closed by a slash
        assert_eq!(date_from_link("/archive/2024/01/05"), None);
    }

    #[test]
    fn test_normalize_tickers() {
        let tickers = normalize_tickers(&[" aapl", "MSFT", "AAPL", "", "brk.b"]);
        assert_eq!(tickers, vec!["AAPL", "MSFT", "BRK.B"]);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
