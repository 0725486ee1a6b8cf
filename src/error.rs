//! Typed failure categories for the scraper.
//!
//! Errors are grouped by how far they are allowed to travel:
//!
//! - [`DateParseError`], [`ExtractError`] and non-fatal [`BrowserError`]s are
//!   per-item failures. The pipeline logs them and drops the affected document.
//! - [`BrowserError::Transport`] and [`BrowserError::SessionLost`] are
//!   resource-level and end the run through [`RunError`].
//! - An out-of-range answer from the sink is not an error at all; see
//!   [`crate::ingest::Rejection`].

use thiserror::Error;

/// A free-text timestamp that matched none of the known formats.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date `{input}`")]
pub struct DateParseError {
    pub input: String,
}

/// Failures reported by the browser automation layer.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The WebDriver endpoint could not be reached or returned garbage.
    #[error("webdriver transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The browser session is gone (crashed browser, killed driver, ...).
    #[error("browser session lost: {0}")]
    SessionLost(String),
    /// The driver rejected a single command.
    #[error("webdriver command failed ({error}): {message}")]
    Command { error: String, message: String },
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, String),
    /// A well-formed response that did not have the expected shape.
    #[error("unexpected webdriver response: {0}")]
    Protocol(String),
}

impl BrowserError {
    /// Whether the error means the session itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrowserError::Transport(_) | BrowserError::SessionLost(_))
    }
}

/// Field extraction failures for a single article page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("page has no <main> content region")]
    NotAnArticle,
    #[error("required field `{0}` not found")]
    MissingField(&'static str),
    #[error("publication date: {0}")]
    Date(#[from] DateParseError),
}

/// Why a single document could not be completed.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("invalid link: {0}")]
    Link(#[from] url::ParseError),
}

impl CompletionError {
    pub fn is_fatal(&self) -> bool {
        match self {
            CompletionError::Browser(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed is not valid RSS: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Resource-level failures that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("restriction date: {0}")]
    Date(#[from] DateParseError),
}
