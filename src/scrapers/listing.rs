//! Listing-mode discovery.
//!
//! The ECB publication index renders every publication into one `dl` and
//! lazy-loads more rows whenever the `.lazy-load-hit` sentinel scrolls into
//! view. There is no "next page" control: pagination is done once the
//! `.dl-wrapper` container stops growing.
//!
//! Rows come back in site display order (newest first) and are never
//! re-sorted; the pipeline relies on that order to stop early.

use crate::browser::{Browser, Element, Locator, tolerate, wait_until};
use crate::config::{ScraperConfig, Timings};
use crate::dates;
use crate::error::BrowserError;
use crate::models::ListingEntry;
use crate::scrapers::extract::element_text;
use chrono::Datelike;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

pub const CONSENT_XPATH: &str = "//a[contains(text(),'I understand and I accept')]";
const SENTINEL: &str = ".lazy-load-hit";
const CONTAINER: &str = ".dl-wrapper";
const SCROLL_SCRIPT: &str = "arguments[0].scrollIntoView();";

static LISTING_DL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.sort-wrapper dl").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.title a[href]").unwrap());

/// Load the index page, expand it fully and collect its publication rows.
///
/// Only a failure to load the index itself (or a dead session) is an error;
/// consent, year filters and pagination are best effort.
#[instrument(level = "info", skip_all, fields(index_url = %config.index_url))]
pub async fn discover<B: Browser>(
    browser: &mut B,
    config: &ScraperConfig,
) -> Result<Vec<ListingEntry>, BrowserError> {
    let timings = &config.timings;

    browser.navigate(&config.index_url).await?;
    sleep(timings.page_load_wait).await;

    dismiss_consent(browser, timings).await?;
    select_years(browser, &config.years).await?;
    let grown = paginate(browser, timings).await?;

    let html = browser.page_source().await?;
    let entries = parse_listing(&html, &config.years);
    info!(
        count = entries.len(),
        pagination_steps = grown,
        "Indexed ECB listing"
    );
    Ok(entries)
}

/// Click the cookie banner's accept link when the banner is shown.
async fn dismiss_consent<B: Browser>(browser: &mut B, timings: &Timings) -> Result<(), BrowserError> {
    let Some(button) = tolerate(browser.find(&Locator::xpath(CONSENT_XPATH)).await)?.flatten()
    else {
        debug!("No consent overlay");
        return Ok(());
    };
    if tolerate(browser.click(&button).await)?.is_some() {
        debug!("Accepted cookie consent");
        sleep(timings.consent_wait).await;
    }
    Ok(())
}

/// Tick the configured years in the listing's year filter.
async fn select_years<B: Browser>(browser: &mut B, years: &[i32]) -> Result<(), BrowserError> {
    for year in years {
        let locator = Locator::css(format!("select option[value='{year}']"));
        match tolerate(browser.find(&locator).await)?.flatten() {
            Some(option) => {
                if tolerate(browser.click(&option).await)?.is_some() {
                    debug!(year, "Selected year filter");
                }
            }
            None => debug!(year, "Year filter option not found"),
        }
    }
    Ok(())
}

/// Scroll the lazy-load sentinel until the results container stops growing.
///
/// Returns how many scrolls made the container grow. A height sequence of
/// `[100, 250, 250]` gives 2: the third scroll sees no growth and stops.
/// Per-command failures end pagination with whatever has rendered so far.
#[instrument(level = "debug", skip_all)]
pub async fn paginate<B: Browser>(browser: &mut B, timings: &Timings) -> Result<usize, BrowserError> {
    let Some(sentinel) = tolerate(
        wait_until(
            browser,
            &Locator::css(SENTINEL),
            timings.element_timeout,
            timings.poll_interval,
        )
        .await,
    )?
    else {
        warn!("No lazy-load sentinel on listing page; skipping pagination");
        return Ok(0);
    };
    let Some(container) = tolerate(
        wait_until(
            browser,
            &Locator::css(CONTAINER),
            timings.element_timeout,
            timings.poll_interval,
        )
        .await,
    )?
    else {
        warn!("No results container on listing page; skipping pagination");
        return Ok(0);
    };

    let mut height = 0.0;
    let mut grown = 0;
    loop {
        match scroll_once(browser, &sentinel, &container, timings).await {
            Ok(h) if h > height => {
                height = h;
                grown += 1;
                sleep(timings.growth_wait).await;
            }
            Ok(_) => break,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, grown, "Pagination interrupted; keeping rendered rows");
                break;
            }
        }
    }
    debug!(grown, height, "Listing height settled");
    Ok(grown)
}

async fn scroll_once<B: Browser>(
    browser: &mut B,
    sentinel: &Element,
    container: &Element,
    timings: &Timings,
) -> Result<f64, BrowserError> {
    browser
        .execute_script(SCROLL_SCRIPT, std::slice::from_ref(sentinel))
        .await?;
    sleep(timings.scroll_pause).await;
    browser.element_height(container).await
}

/// Collect publication rows from the rendered listing, in document order.
///
/// Each `<dd>` contributes the `href` of its title link; the preceding
/// `<dt isodate="...">` dates it. With a non-empty `years` filter, rows dated
/// outside those years are dropped. Rows without a title link are skipped and
/// repeated links keep their first position.
pub fn parse_listing(html: &str, years: &[i32]) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let Some(dl) = document.select(&LISTING_DL).next() else {
        warn!("Listing container not found in page source");
        return Vec::new();
    };

    let mut date = None;
    let mut entries = Vec::new();
    for row in dl.children().filter_map(ElementRef::wrap) {
        match row.value().name() {
            "dt" => {
                date = row
                    .value()
                    .attr("isodate")
                    .and_then(|d| dates::normalize(d).ok());
            }
            "dd" => {
                let Some(anchor) = row.select(&TITLE_LINK).next() else {
                    continue;
                };
                let Some(href) = anchor.value().attr("href").map(str::trim) else {
                    continue;
                };
                if href.is_empty() {
                    continue;
                }
                if let Some(d) = date {
                    if !years.is_empty() && !years.contains(&d.year()) {
                        continue;
                    }
                }
                let title = Some(element_text(anchor)).filter(|t| !t.is_empty());
                entries.push(ListingEntry {
                    link: href.to_string(),
                    title,
                    published: date,
                });
            }
            _ => {}
        }
    }

    entries
        .into_iter()
        .unique_by(|e| e.link.clone())
        .collect()
}
