//! Link discovery for earnings call transcripts.
//!
//! Discovery turns a ticker into the list of transcript links the site shows
//! on the ticker's quote page. It follows a two-level pattern:
//!
//! 1. **Strategies**: an ordered list of exchange listings (`nasdaq`, `nyse`,
//!    ...). Each is tried until one has a quote page for the ticker.
//! 2. **Sessions**: every attempt runs inside a scoped [`ListingSession`]
//!    which is always closed, whatever the attempt's outcome.
//!
//! # Session back-ends
//!
//! | Back-end | Module | Pagination | Notes |
//! |----------|--------|------------|-------|
//! | HTTP | [`fool`] | first page only | `reqwest` + `scraper`, no JavaScript |
//! | Headless Chromium | `browser` | full | `browser` feature, `chromiumoxide` |

use crate::errors::Result;
use crate::models::{CallStub, Fragment};
use url::Url;

#[cfg(feature = "browser")]
pub mod browser;
pub mod fool;

/// Capability to list the earnings calls published for a ticker.
pub trait CallDiscovery {
    /// Ordered call stubs as the site presents them (most recent first).
    async fn list_calls(&self, ticker: &str) -> Result<Vec<CallStub>>;
}

/// One scoped visit to a quote page.
///
/// Steps run in order: [`open`](Self::open), [`dismiss_consent`](Self::dismiss_consent),
/// [`expand_listing`](Self::expand_listing), [`anchors`](Self::anchors), and
/// finally [`close`](Self::close), which runs on every exit path.
pub trait ListingSession {
    /// Load the quote page. `Ok(false)` means the ticker is not listed there.
    async fn open(&mut self, url: &Url, ticker: &str) -> Result<bool>;

    /// Dismiss the cookie-consent interstitial.
    async fn dismiss_consent(&mut self) -> Result<()>;

    /// Press "View More" until the listing is exhausted; returns the click count.
    async fn expand_listing(&mut self, ticker: &str) -> Result<usize>;

    /// Anchor fragments found inside the transcript container.
    async fn anchors(&mut self) -> Result<Vec<Fragment>>;

    /// Release the session's resources.
    async fn close(self) -> Result<()>;
}

/// Opens fresh listing sessions.
pub trait SessionFactory {
    type Session: ListingSession;

    async fn start(&self) -> Result<Self::Session>;
}

/// Label text of the pagination button on a quote page.
pub fn view_more_label(ticker: &str) -> String {
    format!("View More {} Earnings Transcripts", ticker.to_uppercase())
}
