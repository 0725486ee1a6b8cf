//! Run configuration.
//!
//! [`ScraperConfig`] is built once in `main` and handed to the pipeline by
//! value; nothing mutates it afterwards. Values are layered:
//!
//! 1. [`ScraperConfig::default`], the ECB constants
//! 2. an optional YAML file (every key optional, see [`FileConfig`])
//! 3. CLI flags / environment variables (applied in `main`)

use crate::dates;
use crate::error::ConfigError;
use crate::ingest::Restrictions;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const SITE_ORIGIN: &str = "https://www.ecb.europa.eu";
pub const INDEX_URL: &str = "https://www.ecb.europa.eu/pub/pubbydate/html/index.en.html";
pub const FEED_URL: &str = "https://www.ecb.europa.eu/rss/press.html";
pub const WEBDRIVER_URL: &str = "http://localhost:9515";

/// Where publications are discovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// RSS feed, completed page by page.
    Feed,
    /// Lazy-loaded publication listing.
    Listing,
}

/// Fixed and polled delays used while waiting for the site to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    pub page_load_wait: Duration,
    pub consent_wait: Duration,
    pub scroll_pause: Duration,
    pub growth_wait: Duration,
    pub article_wait: Duration,
    pub element_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            page_load_wait: Duration::from_secs(5),
            consent_wait: Duration::from_millis(500),
            scroll_pause: Duration::from_millis(100),
            growth_wait: Duration::from_secs(1),
            article_wait: Duration::from_secs(2),
            element_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Timings {
    /// No waiting at all; for driving fixtures.
    pub fn immediate() -> Self {
        Self {
            page_load_wait: Duration::ZERO,
            consent_wait: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            growth_wait: Duration::ZERO,
            article_wait: Duration::ZERO,
            element_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub mode: Mode,
    pub site_origin: String,
    pub index_url: String,
    pub feed_url: String,
    /// Listing mode only. Empty means every year the listing renders.
    pub years: Vec<i32>,
    pub webdriver_url: String,
    pub timings: Timings,
    pub restrictions: Restrictions,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Feed,
            site_origin: SITE_ORIGIN.to_string(),
            index_url: INDEX_URL.to_string(),
            feed_url: FEED_URL.to_string(),
            years: Vec::new(),
            webdriver_url: WEBDRIVER_URL.to_string(),
            timings: Timings::default(),
            restrictions: Restrictions::default(),
        }
    }
}

/// Shape of the optional YAML config file.
///
/// ```yaml
/// mode: listing
/// years: [2025]
/// restrictions:
///   from_date: 2024-01-01
///   maximum_materials: 100
/// timings:
///   growth_wait_ms: 1500
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub mode: Option<Mode>,
    pub site_origin: Option<String>,
    pub index_url: Option<String>,
    pub feed_url: Option<String>,
    pub years: Option<Vec<i32>>,
    pub webdriver_url: Option<String>,
    #[serde(default)]
    pub timings: FileTimings,
    #[serde(default)]
    pub restrictions: FileRestrictions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTimings {
    pub page_load_wait_ms: Option<u64>,
    pub consent_wait_ms: Option<u64>,
    pub scroll_pause_ms: Option<u64>,
    pub growth_wait_ms: Option<u64>,
    pub article_wait_ms: Option<u64>,
    pub element_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRestrictions {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub maximum_materials: Option<usize>,
    pub to_last_material: Option<bool>,
}

impl ScraperConfig {
    /// Read a YAML config file and layer it over the defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw)?;
        info!(mode = ?config.mode, "Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = serde_yaml::from_str(raw)?;
        let mut config = Self::default();
        config.apply_file(file)?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(mode) = file.mode {
            self.mode = mode;
        }
        if let Some(v) = file.site_origin {
            self.site_origin = v;
        }
        if let Some(v) = file.index_url {
            self.index_url = v;
        }
        if let Some(v) = file.feed_url {
            self.feed_url = v;
        }
        if let Some(v) = file.years {
            self.years = v;
        }
        if let Some(v) = file.webdriver_url {
            self.webdriver_url = v;
        }

        let t = file.timings;
        let ms = Duration::from_millis;
        let timings = &mut self.timings;
        for (slot, value) in [
            (&mut timings.page_load_wait, t.page_load_wait_ms),
            (&mut timings.consent_wait, t.consent_wait_ms),
            (&mut timings.scroll_pause, t.scroll_pause_ms),
            (&mut timings.growth_wait, t.growth_wait_ms),
            (&mut timings.article_wait, t.article_wait_ms),
            (&mut timings.element_timeout, t.element_timeout_ms),
            (&mut timings.poll_interval, t.poll_interval_ms),
        ] {
            if let Some(v) = value {
                *slot = ms(v);
            }
        }

        let r = file.restrictions;
        if let Some(v) = r.from_date {
            self.restrictions.from_date = Some(parse_boundary(&v)?);
        }
        if let Some(v) = r.to_date {
            self.restrictions.to_date = Some(parse_boundary(&v)?);
        }
        if let Some(v) = r.maximum_materials {
            self.restrictions.maximum_materials = Some(v);
        }
        if let Some(v) = r.to_last_material {
            self.restrictions.to_last_material = v;
        }
        Ok(())
    }
}

/// Parse a restriction boundary given on the command line or in YAML.
pub fn parse_boundary(raw: &str) -> Result<NaiveDateTime, ConfigError> {
    Ok(dates::normalize(raw)?)
}
