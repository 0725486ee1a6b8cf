//! Browser automation capability.
//!
//! The scrapers only ever talk to a [`Browser`]: navigate, locate elements,
//! read them, click them and run small scripts. The production implementation
//! is [`webdriver::WebDriver`], a W3C WebDriver client; tests use a scripted
//! in-memory browser.
//!
//! Everything here is sequential. A browser is owned by one run at a time and
//! every call blocks the run until the driver answers.

use crate::error::BrowserError;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

pub mod webdriver;

#[cfg(test)]
pub mod fake;

/// How to find an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{s}`"),
            Locator::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

/// Opaque handle to an element of the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub String);

/// The operations the scraper needs from a browser session.
pub trait Browser {
    /// Load `url` in the current tab.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// First element matching `locator`, or `None` when nothing matches.
    async fn find(&mut self, locator: &Locator) -> Result<Option<Element>, BrowserError>;

    /// Every element matching `locator`, in document order.
    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<Element>, BrowserError>;

    /// Rendered text of an element.
    async fn read_text(&mut self, element: &Element) -> Result<String, BrowserError>;

    async fn read_attribute(
        &mut self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn click(&mut self, element: &Element) -> Result<(), BrowserError>;

    /// Rendered height of an element in CSS pixels.
    async fn element_height(&mut self, element: &Element) -> Result<f64, BrowserError>;

    /// Run `script` synchronously; `args` are visible as `arguments[i]`.
    async fn execute_script(
        &mut self,
        script: &str,
        args: &[Element],
    ) -> Result<serde_json::Value, BrowserError>;

    /// Serialized DOM of the current page.
    async fn page_source(&mut self) -> Result<String, BrowserError>;
}

/// Poll until `locator` matches something, or give up after `timeout`.
///
/// `find` is always tried at least once, so a zero timeout still succeeds on
/// a page that is already rendered.
#[instrument(level = "debug", skip(browser, locator), fields(%locator))]
pub async fn wait_until<B: Browser>(
    browser: &mut B,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<Element, BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(element) = browser.find(locator).await? {
            return Ok(element);
        }
        if Instant::now() >= deadline {
            debug!(?timeout, "Element never appeared");
            return Err(BrowserError::Timeout(timeout, locator.to_string()));
        }
        sleep(poll).await;
    }
}

/// Downgrade a per-command failure to `None`, keeping fatal errors fatal.
///
/// For best-effort page interactions whose absence is expected (consent
/// overlays, filters, optional widgets).
pub fn tolerate<T>(result: Result<T, BrowserError>) -> Result<Option<T>, BrowserError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!(error = %e, "Ignoring browser command failure");
            Ok(None)
        }
    }
}
