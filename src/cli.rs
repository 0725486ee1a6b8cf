//! Command-line interface definitions for the ECB scraper.
//!
//! Every option can also come from the environment; anything left unset
//! falls back to the YAML config file (when given) and then to the built-in
//! ECB defaults.

use crate::config::{self, Mode, ScraperConfig};
use crate::error::ConfigError;
use clap::Parser;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Feed mode, everything published since the start of 2024
/// ecb_scrape -j ./json --from-date 2024-01-01
///
/// # Listing mode for a single year against a remote chromedriver
/// ecb_scrape -j ./json --mode listing --year 2025 --webdriver-url http://chrome:9515
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON documents and the seen index
    #[arg(short, long, env = "ECB_JSON_OUTPUT_DIR")]
    pub json_output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "ECB_CONFIG")]
    pub config: Option<String>,

    /// Discovery mode
    #[arg(long, value_enum, env = "ECB_MODE")]
    pub mode: Option<Mode>,

    /// WebDriver endpoint (chromedriver / geckodriver)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// RSS feed URL (feed mode)
    #[arg(long, env = "ECB_FEED_URL")]
    pub feed_url: Option<String>,

    /// Publication index URL (listing mode)
    #[arg(long, env = "ECB_INDEX_URL")]
    pub index_url: Option<String>,

    /// Year to include in listing mode; repeatable
    #[arg(long = "year")]
    pub years: Vec<i32>,

    /// Oldest publication date to accept
    #[arg(long, env = "ECB_FROM_DATE")]
    pub from_date: Option<String>,

    /// Newest publication date to accept
    #[arg(long, env = "ECB_TO_DATE")]
    pub to_date: Option<String>,

    /// Maximum number of documents accepted per run
    #[arg(long, env = "ECB_MAX_MATERIALS")]
    pub max_materials: Option<usize>,

    /// Stop at the first publication stored by an earlier run
    #[arg(long)]
    pub to_last_material: bool,
}

impl Cli {
    /// Layer the command line over `base`.
    pub fn apply(&self, mut base: ScraperConfig) -> Result<ScraperConfig, ConfigError> {
        if let Some(mode) = self.mode {
            base.mode = mode;
        }
        if let Some(url) = &self.webdriver_url {
            base.webdriver_url = url.clone();
        }
        if let Some(url) = &self.feed_url {
            base.feed_url = url.clone();
        }
        if let Some(url) = &self.index_url {
            base.index_url = url.clone();
        }
        if !self.years.is_empty() {
            base.years = self.years.clone();
        }
        if let Some(d) = &self.from_date {
            base.restrictions.from_date = Some(config::parse_boundary(d)?);
        }
        if let Some(d) = &self.to_date {
            base.restrictions.to_date = Some(config::parse_boundary(d)?);
        }
        if let Some(n) = self.max_materials {
            base.restrictions.maximum_materials = Some(n);
        }
        if self.to_last_material {
            base.restrictions.to_last_material = true;
        }
        Ok(base)
    }
}
