//! Data models for discovered publications.
//!
//! - [`PublicationDocument`]: the normalized record handed to the sink
//! - [`Other`]: the optional extras attached to a document (only `category` today)
//! - [`FeedEntry`]: a raw RSS item before normalization
//! - [`ListingEntry`]: one row of the publication listing page

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single ECB publication.
///
/// Documents start life as stubs produced by discovery, are completed in place
/// and are then moved into the sink. Nothing keeps a reference after hand-off.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PublicationDocument {
    /// Assigned by the sink on acceptance.
    pub id: Option<u64>,
    pub title: String,
    /// Feed summary, or the first bulleted list of the page body.
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    /// Full body text. Only ever set for `.html` publications.
    pub text: Option<String>,
    /// Relative or absolute URL as discovered.
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub other: Option<Other>,
    pub published: Option<NaiveDateTime>,
    /// When the full text was fetched.
    pub loaded: Option<NaiveDateTime>,
    /// Where the record was persisted.
    pub storage: Option<String>,
}

/// Extra publication attributes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Other {
    pub category: String,
}

impl PublicationDocument {
    /// A bare stub that only knows where the publication lives.
    pub fn stub(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Self::default()
        }
    }

    /// Category label, if the page carried one.
    pub fn category(&self) -> Option<&str> {
        self.other.as_ref().map(|o| o.category.as_str())
    }
}

/// One `<item>` of the RSS feed, as published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    /// Raw `pubDate`; normalized during discovery.
    pub published: String,
}

/// One publication row of the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub link: String,
    pub title: Option<String>,
    /// The row's `isodate`, when the listing printed one.
    pub published: Option<NaiveDateTime>,
}

impl From<ListingEntry> for PublicationDocument {
    fn from(entry: ListingEntry) -> Self {
        Self {
            title: entry.title.unwrap_or_default(),
            published: entry.published,
            ..Self::stub(entry.link)
        }
    }
}
