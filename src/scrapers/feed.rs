//! Feed-mode discovery from the ECB press RSS feed.
//!
//! The feed already carries title, summary, link and date, so discovery needs
//! no browser: entries become document stubs directly and only the full text
//! is left for completion.

use crate::dates;
use crate::error::{DateParseError, FeedError};
use crate::models::{FeedEntry, PublicationDocument};
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Something that can fetch and parse a syndication feed.
pub trait FeedSource {
    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError>;
}

/// [`FeedSource`] over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpFeed {
    client: Client,
}

impl HttpFeed {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedSource for HttpFeed {
    #[instrument(level = "info", skip(self))]
    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = body.len(), "Fetched feed");
        parse_feed(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Parse an RSS 2.0 document into entries, in feed order.
///
/// Items without a link are skipped: there would be nothing to complete
/// or de-duplicate on.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let rss: Rss = from_str(xml)?;
    let entries: Vec<FeedEntry> = rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let link = item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
            Some(FeedEntry {
                title: item.title.map(|t| t.trim().to_string()).unwrap_or_default(),
                summary: item.description.map(|d| d.trim().to_string()),
                link,
                published: item.pub_date.unwrap_or_default(),
            })
        })
        .collect();
    info!(count = entries.len(), "Parsed ECB feed");
    Ok(entries)
}

/// Turn feed entries into document stubs, preserving feed order.
///
/// A bad `pubDate` fails only its own entry.
pub fn discover(entries: Vec<FeedEntry>) -> Vec<Result<PublicationDocument, DateParseError>> {
    entries.into_iter().map(stub_from_entry).collect()
}

fn stub_from_entry(entry: FeedEntry) -> Result<PublicationDocument, DateParseError> {
    let published = dates::normalize(&entry.published)?;
    Ok(PublicationDocument {
        title: entry.title,
        abstract_: entry.summary.filter(|s| !s.is_empty()),
        published: Some(published),
        ..PublicationDocument::stub(entry.link)
    })
}
