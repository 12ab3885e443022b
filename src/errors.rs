//! Error types shared by the scraping pipeline.
//!
//! Only discovery errors are allowed to stop work on a ticker; everything the
//! orchestrator sees from a page fetch is logged and turned into empty content.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The ticker has no quote page on any of the exchanges that were tried.
    #[error("ticker {ticker} not found on any listing (tried: {})", .tried.join(", "))]
    NotFound { ticker: String, tried: Vec<String> },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("listing session error: {0}")]
    Session(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// True for the "ticker is not listed anywhere" outcome of discovery.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScrapeError::NotFound { .. })
    }

    /// True for client-error statuses that another attempt cannot fix.
    ///
    /// 408 and 429 are excluded: the server may answer on a later try.
    pub fn is_permanent(&self) -> bool {
        match self {
            ScrapeError::Status { status, .. } => {
                status.is_client_error()
                    && *status != reqwest::StatusCode::REQUEST_TIMEOUT
                    && *status != reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
