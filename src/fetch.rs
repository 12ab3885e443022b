//! Transcript page fetching with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`PageFetch`]: core trait turning a URL into the page's text fragments
//! - [`HttpFetch`]: plain HTTP GET + HTML parsing with `reqwest` and `scraper`
//! - [`RetryFetch`]: decorator that adds retry logic to any `PageFetch`
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::config::Settings;
use crate::errors::{Result, ScrapeError};
use crate::models::Fragment;
use rand::{Rng, rng};
use scraper::{Html, Selector};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Capability to fetch the renderable text fragments of a page.
pub trait PageFetch {
    /// Fetch `url` and return its text-bearing nodes in document order.
    async fn fetch(&self, url: &str) -> Result<Vec<Fragment>>;
}

/// Build the shared HTTP client used for quote pages and transcript pages.
///
/// # Arguments
///
/// * `settings` - Supplies the `User-Agent` and the per-request timeout
///
/// # Returns
///
/// A `reqwest::Client` that is cheap to clone and share between sessions.
pub fn build_client(settings: &Settings) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(StdDuration::from_secs(settings.request_timeout_secs))
        .build()?;
    Ok(client)
}

/// Compile a CSS selector, reporting bad selectors as configuration errors.
pub fn compile_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Config(format!("invalid selector {css:?}: {e}")))
}

/// Parse an HTML document and collect the nodes matching `selector`.
pub fn parse_fragments(html: &str, selector: &Selector) -> Vec<Fragment> {
    let document = Html::parse_document(html);
    document.select(selector).map(Fragment::from_element).collect()
}

/// Fetches transcript pages over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetch {
    client: reqwest::Client,
    selector: Selector,
}

impl HttpFetch {
    /// Create a fetcher that keeps the nodes matching `content_selector`.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client (see [`build_client`])
    /// * `content_selector` - CSS selector for transcript nodes, `"h2, p"` by default
    ///
    /// # Returns
    ///
    /// `ScrapeError::Config` when the selector does not parse.
    pub fn new(client: reqwest::Client, content_selector: &str) -> Result<Self> {
        Ok(Self {
            client,
            selector: compile_selector(content_selector)?,
        })
    }
}

impl PageFetch for HttpFetch {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<Fragment>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.text().await?;
        let fragments = parse_fragments(&body, &self.selector);
        info!(bytes = body.len(), fragments = fragments.len(), "Parsed transcript page");
        Ok(fragments)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetch`].
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
    max_jitter_ms: u64,
}

impl<T> RetryFetch<T>
where
    T: PageFetch,
{
    /// Create a new retry wrapper around an existing [`PageFetch`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying fetcher to wrap
    /// * `max_retries` - Extra attempts after the first; `0` makes a single attempt
    /// * `base_delay` - Delay before the first retry, doubled on each further one
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = HttpFetch::new(client, "h2, p")?;
    /// let retrying = RetryFetch::new(fetcher, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter_ms: 250,
        }
    }

    #[cfg(test)]
    pub fn with_max_jitter_ms(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter_ms);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetch for RetryFetch<T>
where
    T: PageFetch,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<Fragment>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(fragments) => {
                    if attempt > 0 {
                        debug!(attempt, "fetch() succeeded after retrying");
                    }
                    return Ok(fragments);
                }
                Err(e) if e.is_permanent() => {
                    warn!(attempt, error = %e, "fetch() failed permanently; not retrying");
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
