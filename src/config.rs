//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command-line flags.
//!
//! ```yaml
//! base_url: https://www.fool.com/
//! exchanges: [nasdaq, nyse]
//! request_timeout_secs: 10
//! max_retries: 2
//! ```

use crate::cli::Cli;
use crate::errors::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Site root; quote pages live under `quote/{exchange}/{ticker}/`.
    pub base_url: String,
    /// Exchange listings tried in order during discovery.
    pub exchanges: Vec<String>,
    pub request_timeout_secs: u64,
    /// Extra attempts for a failed transcript page fetch.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
    /// Nodes of a transcript page handed to the extractor.
    pub content_selector: String,
    /// Element holding the earnings transcript links on a quote page.
    pub listing_container_selector: String,
    /// Discover links with a headless browser (needs the `browser` feature).
    pub browser: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://www.fool.com/".to_string(),
            exchanges: vec!["nasdaq".to_string(), "nyse".to_string()],
            request_timeout_secs: 10,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            user_agent: concat!("earnings_call_transcripts/", env!("CARGO_PKG_VERSION")).to_string(),
            content_selector: "h2, p".to_string(),
            listing_container_selector: "div#earnings-transcript-container".to_string(),
            browser: false,
        }
    }
}

impl Settings {
    /// Load defaults, overlaid with the YAML file at `path` when given.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional YAML file; keys it omits keep their defaults
    ///
    /// # Returns
    ///
    /// The validated settings; an error if the file cannot be read, contains
    /// unknown keys, or fails validation.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let settings: Settings = serde_yaml::from_str(&raw)?;
                info!(path = %path.display(), "Loaded configuration file");
                settings
            }
            None => Settings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Apply command-line overrides on top of file/default settings.
    pub fn with_cli(mut self, cli: &Cli) -> Result<Self> {
        if let Some(exchanges) = &cli.exchanges {
            self.exchanges = exchanges.clone();
        }
        if let Some(secs) = cli.timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(retries) = cli.max_retries {
            self.max_retries = retries;
        }
        if cli.browser {
            self.browser = true;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if !self.base_url.ends_with('/') {
            return Err(ScrapeError::Config(format!(
                "base_url must end with '/': {}",
                self.base_url
            )));
        }
        if self.exchanges.iter().all(|e| e.trim().is_empty()) {
            return Err(ScrapeError::Config("at least one exchange is required".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ScrapeError::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
