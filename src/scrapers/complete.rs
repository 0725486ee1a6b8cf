//! Document completion.
//!
//! HTML publications are opened in the browser and their page fields are
//! merged into the stub. Anything else (PDFs, spreadsheets, ...) is left
//! exactly as discovered.

use crate::browser::{Browser, Locator, wait_until};
use crate::config::ScraperConfig;
use crate::error::CompletionError;
use crate::models::{Other, PublicationDocument};
use crate::scrapers::extract::{PageFields, extract_fields};
use chrono::Local;
use tokio::time::sleep;
use tracing::{debug, instrument};
use url::Url;

/// Resolve a discovered link against the site origin.
pub fn resolve_link(origin: &str, link: &str) -> Result<Url, url::ParseError> {
    Url::parse(origin)?.join(link)
}

/// Whether `link` points at a navigable HTML article.
pub fn is_article(url: &Url) -> bool {
    url.path().ends_with(".html")
}

/// Complete `doc` in place.
///
/// Returns `Ok(false)` when the document is not an HTML article and was left
/// untouched, `Ok(true)` after a successful merge.
#[instrument(level = "info", skip_all, fields(link = %doc.link))]
pub async fn complete<B: Browser>(
    browser: &mut B,
    config: &ScraperConfig,
    doc: &mut PublicationDocument,
) -> Result<bool, CompletionError> {
    let url = resolve_link(&config.site_origin, &doc.link)?;
    if !is_article(&url) {
        debug!("Not an HTML publication; forwarding as discovered");
        return Ok(false);
    }

    let timings = &config.timings;
    browser.navigate(url.as_str()).await?;
    debug!(%url, "Entered publication page");
    sleep(timings.article_wait).await;
    wait_until(
        browser,
        &Locator::css("main"),
        timings.element_timeout,
        timings.poll_interval,
    )
    .await?;

    let html = browser.page_source().await?;
    let fields = extract_fields(&html)?;
    merge(doc, fields);
    Ok(true)
}

/// Fill the fields of `doc` that are still unset.
///
/// Values already present (for instance a feed-provided title or summary)
/// always win over what the page says.
pub fn merge(doc: &mut PublicationDocument, fields: PageFields) {
    if doc.title.is_empty() {
        doc.title = fields.title;
    }
    if doc.abstract_.is_none() {
        doc.abstract_ = fields.abstract_;
    }
    if doc.text.is_none() {
        doc.text = Some(fields.text);
        doc.loaded = Some(Local::now().naive_local());
    }
    if doc.published.is_none() {
        doc.published = Some(fields.published);
    }
    if doc.other.is_none() {
        doc.other = fields.category.map(|category| Other { category });
    }
}
