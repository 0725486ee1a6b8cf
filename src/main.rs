//! # ECB Scrape
//!
//! Discovers European Central Bank publications, completes them with the
//! full article text and hands them to ingestion as normalized JSON
//! documents.
//!
//! ## Features
//!
//! - Two discovery modes: the RSS press feed, or the "publications by date"
//!   listing driven through a WebDriver browser with lazy-load pagination
//! - Completion of HTML articles with title, category, date, text and footnotes
//! - Date normalization across the formats the site and feed use
//! - Acceptance window by date range, per-run cap and last stored material
//! - Per-run JSON output plus a `seen.json` index shared between runs
//!
//! ## Usage
//!
//! ```sh
//! chromedriver --port=9515 &
//! ecb_scrape -j ./json --from-date 2024-01-01
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: newest-first stubs from the feed or the listing page
//! 2. **Completion**: visit `.html` stubs and fill in missing fields
//! 3. **Hand-off**: the sink applies the acceptance window and assigns ids;
//!    the first terminal rejection ends the run
//! 4. **Output**: accepted documents as JSON, then the seen index update

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod config;
mod dates;
mod error;
mod ingest;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use browser::webdriver::WebDriver;
use cli::Cli;
use config::ScraperConfig;
use ingest::RestrictedSink;
use outputs::{index::SeenIndex, json};
use pipeline::{Discovery, Outcome};
use scrapers::feed::HttpFeed;
use utils::{ensure_writable_dir, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ecb_scrape starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.config, "Parsed CLI arguments");

    // ---- Configuration ----
    let base = match &args.config {
        Some(path) => ScraperConfig::from_yaml_file(path)?,
        None => ScraperConfig::default(),
    };
    let config = args.apply(base)?;
    info!(
        mode = ?config.mode,
        from_date = ?config.restrictions.from_date,
        to_date = ?config.restrictions.to_date,
        maximum_materials = ?config.restrictions.maximum_materials,
        to_last_material = config.restrictions.to_last_material,
        "Configuration resolved"
    );

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let mut index = SeenIndex::load(&args.json_output_dir).await?;
    let mut sink = RestrictedSink::new(config.restrictions.clone())
        .with_history(index.links.clone(), index.last_id);

    // ---- Discover, complete, hand off ----
    let browser = WebDriver::new_session(&config.webdriver_url, !args.headed).await?;
    let mut discovery = Discovery::new(config, browser, HttpFeed::new());
    let result = discovery.run(&mut sink).await;

    if let Err(e) = discovery.into_browser().quit().await {
        warn!(error = %e, "Failed to close WebDriver session");
    }

    // ---- Output ----
    // Whatever was accepted before a failure is still written.
    let mut documents = sink.into_accepted();
    for doc in &documents {
        debug!(id = ?doc.id, title = %truncate_for_log(&doc.title, 80), link = %doc.link, "Accepted");
    }
    json::write_documents(&mut documents, &args.json_output_dir, Local::now().naive_local())
        .await?;
    index.extend(&documents);
    index.save(&args.json_output_dir).await?;

    let elapsed = start_time.elapsed();
    match result {
        Ok(report) => {
            match &report.outcome {
                Outcome::Exhausted => info!("Publication sequence exhausted"),
                Outcome::Finished(restriction) => info!(%restriction, "Run finished"),
            }
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                millis = elapsed.subsec_millis(),
                discovered = report.stats.discovered,
                accepted = report.stats.accepted,
                duplicates = report.stats.duplicates,
                dropped = report.stats.dropped,
                skipped = report.stats.skipped,
                "Execution complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(?elapsed, error = %e, accepted = documents.len(), "Run aborted");
            Err(e.into())
        }
    }
}
