//! Motley Fool quote page discovery.
//!
//! Each ticker has a quote page per exchange listing, e.g.
//! `https://www.fool.com/quote/nasdaq/aapl/`. The page carries an earnings
//! transcript container whose anchors point at transcripts filed under
//! `/earnings/call-transcripts/YYYY/MM/DD/<slug>/`.
//!
//! # HTTP sessions
//!
//! [`HttpSession`] reads the server-rendered document. It needs no consent
//! dismissal, and it sees only the first page of links since "View More"
//! is driven by JavaScript.

use super::{CallDiscovery, ListingSession, SessionFactory, view_more_label};
use crate::config::Settings;
use crate::errors::{Result, ScrapeError};
use crate::fetch::compile_selector;
use crate::models::{CallStub, Fragment};
use itertools::Itertools;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// One exchange listing to try during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingStrategy {
    exchange: String,
}

impl ListingStrategy {
    pub fn new(exchange: &str) -> Self {
        Self {
            exchange: exchange.trim().to_lowercase(),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Quote page for `ticker` on this listing.
    pub fn quote_url(&self, base_url: &Url, ticker: &str) -> Result<Url> {
        let ticker = ticker.trim().to_lowercase();
        let path = format!(
            "quote/{}/{}/",
            urlencoding::encode(&self.exchange),
            urlencoding::encode(&ticker)
        );
        Ok(base_url.join(&path)?)
    }
}

/// Turn transcript anchors into call stubs.
///
/// Anchors without an `href` or without a `/YYYY/MM/DD/` path segment are
/// ignored, relative links are resolved against `base_url`, and repeated
/// links keep their first position.
///
/// # Arguments
///
/// * `anchors` - Anchor fragments from the transcript container, in page order
/// * `base_url` - Site root used to resolve relative links
///
/// # Returns
///
/// One [`CallStub`] per distinct dated link, in the order the page lists them.
pub fn stubs_from_anchors(anchors: &[Fragment], base_url: &Url) -> Vec<CallStub> {
    anchors
        .iter()
        .filter(|anchor| anchor.has_link())
        .filter_map(|anchor| {
            let date = anchor.date_path_segment()?;
            let href = anchor.href()?.trim();
            match base_url.join(href) {
                Ok(link) => Some(CallStub {
                    date,
                    link: link.to_string(),
                }),
                Err(e) => {
                    warn!(%href, error = %e, "Skipping unresolvable transcript link");
                    None
                }
            }
        })
        .unique_by(|stub| stub.link.clone())
        .collect()
}

/// Runs the session steps against one quote page.
async fn browse<S: ListingSession>(
    session: &mut S,
    url: &Url,
    ticker: &str,
) -> Result<Option<Vec<Fragment>>> {
    if !session.open(url, ticker).await? {
        return Ok(None);
    }
    if let Err(e) = session.dismiss_consent().await {
        warn!(error = %e, "Could not dismiss cookie consent; continuing");
    }
    let clicks = session.expand_listing(ticker).await?;
    let anchors = session.anchors().await?;
    debug!(clicks, anchors = anchors.len(), "Quote page listing collected");
    Ok(Some(anchors))
}

/// Discovers transcript links by trying each listing strategy in order.
#[derive(Debug)]
pub struct Discovery<F> {
    factory: F,
    base_url: Url,
    strategies: Vec<ListingStrategy>,
}

impl<F: SessionFactory> Discovery<F> {
    /// Create a discovery over the exchanges listed in `settings`.
    ///
    /// # Arguments
    ///
    /// * `factory` - Opens one listing session per attempt
    /// * `settings` - Supplies `base_url` and the ordered `exchanges`
    ///
    /// # Returns
    ///
    /// `ScrapeError::Config` when no exchange is configured, or
    /// `ScrapeError::Url` when the base URL does not parse.
    pub fn new(factory: F, settings: &Settings) -> Result<Self> {
        let strategies: Vec<ListingStrategy> = settings
            .exchanges
            .iter()
            .filter(|e| !e.trim().is_empty())
            .map(|e| ListingStrategy::new(e))
            .collect();
        if strategies.is_empty() {
            return Err(ScrapeError::Config("no exchange listings configured".into()));
        }
        Ok(Self {
            factory,
            base_url: Url::parse(&settings.base_url)?,
            strategies,
        })
    }

    /// Visit one quote page in its own session; the session is closed on
    /// every path out of here.
    #[instrument(level = "info", skip(self, strategy), fields(exchange = %strategy.exchange()))]
    async fn attempt(
        &self,
        strategy: &ListingStrategy,
        ticker: &str,
    ) -> Result<Option<Vec<Fragment>>> {
        let url = strategy.quote_url(&self.base_url, ticker)?;
        let mut session = self.factory.start().await?;
        let outcome = browse(&mut session, &url, ticker).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close listing session");
        }
        outcome
    }
}

impl<F: SessionFactory> CallDiscovery for Discovery<F> {
    /// Try each exchange in order and return the first listing found.
    ///
    /// A listing that errors falls through to the next exchange. When no
    /// exchange lists the ticker the result is `ScrapeError::NotFound` naming
    /// every exchange tried; when every attempt errored, the last error is
    /// returned instead.
    #[instrument(level = "info", skip(self))]
    async fn list_calls(&self, ticker: &str) -> Result<Vec<CallStub>> {
        let mut tried = Vec::with_capacity(self.strategies.len());
        let mut not_listed = 0usize;
        let mut last_error = None;

        for strategy in &self.strategies {
            tried.push(strategy.exchange().to_string());
            match self.attempt(strategy, ticker).await {
                Ok(Some(anchors)) => {
                    let stubs = stubs_from_anchors(&anchors, &self.base_url);
                    info!(
                        exchange = strategy.exchange(),
                        anchors = anchors.len(),
                        calls = stubs.len(),
                        "Discovered transcript links"
                    );
                    return Ok(stubs);
                }
                Ok(None) => {
                    not_listed += 1;
                    info!(exchange = strategy.exchange(), "Ticker not listed here; trying next listing");
                }
                Err(e) => {
                    warn!(exchange = strategy.exchange(), error = %e, "Listing attempt failed; trying next listing");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if not_listed == 0 => Err(e),
            _ => Err(ScrapeError::NotFound {
                ticker: ticker.to_string(),
                tried,
            }),
        }
    }
}

/// Selectors used to read a rendered quote page.
#[derive(Debug, Clone)]
pub(crate) struct QuotePageSelectors {
    container: Selector,
    anchor: Selector,
    button: Selector,
}

impl QuotePageSelectors {
    pub(crate) fn new(container_css: &str) -> Result<Self> {
        Ok(Self {
            container: compile_selector(container_css)?,
            anchor: compile_selector("a")?,
            button: compile_selector("button")?,
        })
    }

    /// A listing exists when the transcript container or its pagination
    /// button is on the page.
    pub(crate) fn listing_present(&self, html: &str, ticker: &str) -> bool {
        let document = Html::parse_document(html);
        if document.select(&self.container).next().is_some() {
            return true;
        }
        let label = view_more_label(ticker);
        document.select(&self.button).any(|button| {
            button
                .text()
                .flat_map(str::split_whitespace)
                .join(" ")
                .contains(&label)
        })
    }

    pub(crate) fn anchors(&self, html: &str) -> Vec<Fragment> {
        let document = Html::parse_document(html);
        document
            .select(&self.container)
            .flat_map(|container| container.select(&self.anchor))
            .map(Fragment::from_element)
            .collect()
    }
}

/// Opens [`HttpSession`]s sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    client: reqwest::Client,
    selectors: QuotePageSelectors,
}

impl HttpSessionFactory {
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client (see [`crate::fetch::build_client`])
    /// * `settings` - Supplies the transcript container selector
    pub fn new(client: reqwest::Client, settings: &Settings) -> Result<Self> {
        Ok(Self {
            client,
            selectors: QuotePageSelectors::new(&settings.listing_container_selector)?,
        })
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn start(&self) -> Result<HttpSession> {
        Ok(HttpSession {
            client: self.client.clone(),
            selectors: self.selectors.clone(),
            document: None,
        })
    }
}

/// A quote page visit over plain HTTP.
#[derive(Debug)]
pub struct HttpSession {
    client: reqwest::Client,
    selectors: QuotePageSelectors,
    document: Option<String>,
}

impl ListingSession for HttpSession {
    #[instrument(level = "debug", skip(self))]
    async fn open(&mut self, url: &Url, ticker: &str) -> Result<bool> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("Quote page does not exist");
            return Ok(false);
        }
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.text().await?;
        let present = self.selectors.listing_present(&body, ticker);
        if present {
            self.document = Some(body);
        }
        Ok(present)
    }

    async fn dismiss_consent(&mut self) -> Result<()> {
        debug!("Static document has no consent interstitial");
        Ok(())
    }

    async fn expand_listing(&mut self, _ticker: &str) -> Result<usize> {
        debug!("Pagination needs JavaScript; using the server-rendered page only");
        Ok(0)
    }

    async fn anchors(&mut self) -> Result<Vec<Fragment>> {
        let html = self
            .document
            .as_deref()
            .ok_or_else(|| ScrapeError::Session("anchors requested before a page was opened".into()))?;
        Ok(self.selectors.anchors(html))
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}
