//! Call orchestration: discovery, page fetch, extraction.
//!
//! Tickers are processed one after another, and within a ticker one call at
//! a time. A failed discovery drops only that ticker; a failed page fetch
//! leaves only that call with empty content.

use crate::errors::ScrapeError;
use crate::extract::extract;
use crate::fetch::PageFetch;
use crate::models::{CallStub, TickerFailure, TickerResults, TranscriptCall};
use crate::scrapers::CallDiscovery;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: TickerResults,
    pub failures: Vec<TickerFailure>,
}

impl RunReport {
    /// Calls whose content came back empty (fetch failure or no transcript body).
    pub fn empty_calls(&self) -> usize {
        self.results
            .iter()
            .flat_map(|(_, calls)| calls)
            .filter(|call| call.content.is_empty())
            .count()
    }
}

/// Fetch one call's page and extract its transcript.
///
/// Fetch errors are logged and produce empty content.
#[instrument(level = "info", skip(fetcher, stub), fields(date = %stub.date, link = %stub.link))]
async fn transcribe<P: PageFetch>(fetcher: &P, stub: CallStub) -> TranscriptCall {
    let content = match fetcher.fetch(&stub.link).await {
        Ok(fragments) => {
            let content = extract(&fragments);
            if content.is_empty() {
                warn!(fragments = fragments.len(), "No transcript body found on page");
            } else {
                debug!(lines = content.len(), "Extracted transcript");
            }
            content
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch transcript page; leaving content empty");
            Vec::new()
        }
    };
    TranscriptCall::from_stub(stub, content)
}

/// Discover and transcribe every call for one ticker.
///
/// # Arguments
///
/// * `discovery` - Lists the ticker's calls, most recent first
/// * `fetcher` - Fetches each transcript page
/// * `ticker` - Normalized ticker symbol
/// * `limit` - Keep only the first (most recent) N discovered calls
///
/// # Returns
///
/// Every discovered call with its content, in discovery order. Only a
/// discovery error is returned as `Err`; a failed page fetch yields that call
/// with empty content.
#[instrument(level = "info", skip(discovery, fetcher))]
pub async fn collect_ticker<D, P>(
    discovery: &D,
    fetcher: &P,
    ticker: &str,
    limit: Option<usize>,
) -> Result<Vec<TranscriptCall>, ScrapeError>
where
    D: CallDiscovery,
    P: PageFetch,
{
    let mut stubs = discovery.list_calls(ticker).await?;
    if let Some(limit) = limit {
        stubs.truncate(limit);
    }
    info!(calls = stubs.len(), "Fetching transcripts");

    let calls: Vec<TranscriptCall> = stream::iter(stubs)
        .then(|stub| transcribe(fetcher, stub))
        .collect()
        .await;

    let empty = calls.iter().filter(|c| c.content.is_empty()).count();
    info!(calls = calls.len(), empty, "Finished ticker");
    Ok(calls)
}

/// Run every ticker in order and gather the results.
///
/// # Arguments
///
/// * `discovery` - Lists each ticker's calls
/// * `fetcher` - Fetches each transcript page
/// * `tickers` - Tickers to process, in output order
/// * `limit` - Per-ticker cap on processed calls
///
/// # Returns
///
/// A [`RunReport`] holding results for tickers that were discovered and a
/// [`TickerFailure`] for each one that was not. This never fails as a whole.
pub async fn collect_transcripts<D, P>(
    discovery: &D,
    fetcher: &P,
    tickers: &[String],
    limit: Option<usize>,
) -> RunReport
where
    D: CallDiscovery,
    P: PageFetch,
{
    let mut report = RunReport::default();

    for ticker in tickers {
        info!(%ticker, "Getting transcripts");
        match collect_ticker(discovery, fetcher, ticker, limit).await {
            Ok(calls) => report.results.insert(ticker.clone(), calls),
            Err(e) => {
                if e.is_not_found() {
                    warn!(%ticker, error = %e, "Ticker not found; skipping");
                } else {
                    error!(%ticker, error = %e, "Discovery failed; skipping ticker");
                }
                report.failures.push(TickerFailure {
                    ticker: ticker.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        tickers = report.results.len(),
        failed_tickers = report.failures.len(),
        calls = report.results.total_calls(),
        empty_calls = report.empty_calls(),
        "Run complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::models::Fragment;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeDiscovery {
        listings: HashMap<String, Vec<CallStub>>,
    }

    impl CallDiscovery for FakeDiscovery {
        async fn list_calls(&self, ticker: &str) -> Result<Vec<CallStub>> {
            self.listings
                .get(ticker)
                .cloned()
                .ok_or_else(|| ScrapeError::NotFound {
                    ticker: ticker.to_string(),
                    tried: vec!["nasdaq".into(), "nyse".into()],
                })
        }
    }

    /// Serves canned pages; links missing from `pages` fail with a 500.
    struct FakeFetch {
        pages: HashMap<String, Vec<Fragment>>,
        requested: Mutex<Vec<String>>,
    }

    impl PageFetch for FakeFetch {
        async fn fetch(&self, url: &str) -> Result<Vec<Fragment>> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScrapeError::Status {
                    url: url.to_string(),
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                })
        }
    }

    fn stub(date: &str, link: &str) -> CallStub {
        CallStub {
            date: date.into(),
            link: link.into(),
        }
    }

    fn page(lines: &[&str]) -> Vec<Fragment> {
        let mut fragments = vec![Fragment::with_text("h2", "Prepared Remarks:")];
        fragments.extend(lines.iter().map(|l| Fragment::with_text("p", *l)));
        fragments.push(Fragment::with_text("p", "Duration: 10 minutes"));
        fragments
    }

    fn fixture() -> (FakeDiscovery, FakeFetch) {
        let discovery = FakeDiscovery {
            listings: HashMap::from([
                (
                    "AAPL".to_string(),
                    vec![
                        stub("2025-07-31", "https://t/aapl-q3"),
                        stub("2025-05-01", "https://t/aapl-q2"),
                        stub("2025-01-30", "https://t/aapl-q1"),
                    ],
                ),
                ("MSFT".to_string(), vec![stub("2025-07-30", "https://t/msft-q4")]),
            ]),
        };
        let fetch = FakeFetch {
            pages: HashMap::from([
                ("https://t/aapl-q3".to_string(), page(&["Good afternoon."])),
                ("https://t/aapl-q1".to_string(), page(&["Happy new year."])),
                ("https://t/msft-q4".to_string(), page(&["Welcome to Microsoft."])),
            ]),
            requested: Mutex::new(Vec::new()),
        };
        (discovery, fetch)
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_stop_later_calls() {
        let (discovery, fetch) = fixture();
        let tickers = vec!["AAPL".to_string(), "MSFT".to_string()];

        let report = collect_transcripts(&discovery, &fetch, &tickers, None).await;

        assert!(report.failures.is_empty());
        let aapl = report.results.get("AAPL").unwrap();
        assert_eq!(aapl.len(), 3);
        assert_eq!(aapl[0].content, vec!["Good afternoon."]);
        assert!(aapl[1].content.is_empty());
        assert_eq!(aapl[1].date, "2025-05-01");
        assert_eq!(aapl[2].content, vec!["Happy new year."]);
        let msft = report.results.get("MSFT").unwrap();
        assert_eq!(msft[0].content, vec!["Welcome to Microsoft."]);
        assert_eq!(report.empty_calls(), 1);
        assert_eq!(
            *fetch.requested.lock().unwrap(),
            vec![
                "https://t/aapl-q3",
                "https://t/aapl-q2",
                "https://t/aapl-q1",
                "https://t/msft-q4"
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_reported_and_skipped() {
        let (discovery, fetch) = fixture();
        let tickers = vec!["ZZZZ".to_string(), "MSFT".to_string()];

        let report = collect_transcripts(&discovery, &fetch, &tickers, None).await;

        assert_eq!(
            report.results.iter().map(|(t, _)| t).collect::<Vec<_>>(),
            vec!["MSFT"]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].ticker, "ZZZZ");
        assert!(report.failures[0].error.contains("not found"));
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent_calls() {
        let (discovery, fetch) = fixture();

        let calls = collect_ticker(&discovery, &fetch, "AAPL", Some(1)).await.unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].date, "2025-07-31");
        assert_eq!(fetch.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ticker_with_no_calls_still_has_entry() {
        let discovery = FakeDiscovery {
            listings: HashMap::from([("NEWCO".to_string(), vec![])]),
        };
        let fetch = FakeFetch {
            pages: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        };

        let report = collect_transcripts(&discovery, &fetch, &["NEWCO".to_string()], None).await;

        assert_eq!(report.results.get("NEWCO"), Some(&[][..]));
        assert!(report.failures.is_empty());
    }
}
