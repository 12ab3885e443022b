//! Headless Chromium listing sessions (`browser` feature).
//!
//! The quote page only renders its first batch of transcript links; older
//! calls appear after pressing "View More" repeatedly, which needs a real
//! JavaScript engine. Each [`BrowserSession`] owns one browser process and
//! shuts it down in [`ListingSession::close`].

use super::fool::QuotePageSelectors;
use super::{ListingSession, SessionFactory, view_more_label};
use crate::config::Settings;
use crate::errors::{Result, ScrapeError};
use crate::models::Fragment;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::fmt::Display;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// OneTrust "accept all" button shown on first visit.
const CONSENT_BUTTON: &str = "#onetrust-accept-btn-handler";

/// Upper bound on "View More" presses for a single quote page.
const MAX_CLICKS: usize = 200;

/// Clicks the visible pagination button; evaluates to `false` once it is gone.
const CLICK_VIEW_MORE_JS: &str = r#"
(() => {
    const label = __LABEL__;
    const button = [...document.querySelectorAll('button')]
        .find(b => b.innerText.replace(/\s+/g, ' ').includes(label));
    if (!button || button.offsetParent === null) return false;
    button.scrollIntoView(true);
    window.scrollBy(0, -150);
    button.click();
    return true;
})()
"#;

fn session_error(e: impl Display) -> ScrapeError {
    ScrapeError::Session(e.to_string())
}

/// Launches a fresh headless browser per session.
#[derive(Debug, Clone)]
pub struct BrowserSessionFactory {
    selectors: QuotePageSelectors,
    click_pause: Duration,
}

impl BrowserSessionFactory {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            selectors: QuotePageSelectors::new(&settings.listing_container_selector)?,
            click_pause: Duration::from_secs(2),
        })
    }
}

impl SessionFactory for BrowserSessionFactory {
    type Session = BrowserSession;

    #[instrument(level = "debug", skip_all)]
    async fn start(&self) -> Result<BrowserSession> {
        let config = BrowserConfig::builder().build().map_err(ScrapeError::Session)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(session_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });
        info!("Headless browser launched");
        Ok(BrowserSession {
            browser,
            handler,
            page: None,
            selectors: self.selectors.clone(),
            click_pause: self.click_pause,
        })
    }
}

pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    selectors: QuotePageSelectors,
    click_pause: Duration,
}

impl BrowserSession {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::Session("no quote page open".into()))
    }
}

impl ListingSession for BrowserSession {
    #[instrument(level = "debug", skip(self))]
    async fn open(&mut self, url: &Url, ticker: &str) -> Result<bool> {
        let page = self.browser.new_page(url.as_str()).await.map_err(session_error)?;
        page.wait_for_navigation().await.map_err(session_error)?;
        let html = page.content().await.map_err(session_error)?;
        self.page = Some(page);
        Ok(self.selectors.listing_present(&html, ticker))
    }

    async fn dismiss_consent(&mut self) -> Result<()> {
        let page = self.page()?;
        sleep(Duration::from_secs(2)).await;
        let button = page.find_element(CONSENT_BUTTON).await.map_err(session_error)?;
        button.click().await.map_err(session_error)?;
        sleep(Duration::from_secs(3)).await;
        debug!("Cookie consent dismissed");
        Ok(())
    }

    async fn expand_listing(&mut self, ticker: &str) -> Result<usize> {
        let label = serde_json::to_string(&view_more_label(ticker)).map_err(session_error)?;
        let script = CLICK_VIEW_MORE_JS.replace("__LABEL__", &label);
        let page = self.page()?;

        let mut clicks = 0usize;
        while clicks < MAX_CLICKS {
            let clicked = match page.evaluate(script.as_str()).await {
                Ok(result) => result.into_value::<bool>().unwrap_or(false),
                Err(e) => {
                    debug!(error = %e, "View More click failed; assuming listing is exhausted");
                    false
                }
            };
            if !clicked {
                break;
            }
            clicks += 1;
            sleep(self.click_pause).await;
        }
        if clicks == MAX_CLICKS {
            warn!(clicks, "Stopped expanding listing at the click limit");
        }
        Ok(clicks)
    }

    async fn anchors(&mut self) -> Result<Vec<Fragment>> {
        let html = self.page()?.content().await.map_err(session_error)?;
        Ok(self.selectors.anchors(&html))
    }

    async fn close(mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Page close failed");
            }
        }
        let closed = self.browser.close().await.map(|_| ()).map_err(session_error);
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "Waiting for browser exit failed");
        }
        self.handler.abort();
        debug!("Headless browser closed");
        closed
    }
}
