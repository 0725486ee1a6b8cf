//! Discovery pipeline: discover, complete, hand off.
//!
//! One [`Discovery::run`] walks the newest-first sequence produced by the
//! configured [`Mode`], completes each stub and forwards it to the sink in
//! discovery order. The first terminal out-of-range answer ends the run as
//! [`Outcome::Finished`]; since both orderings are newest-first, everything
//! after it would be out of range too.
//!
//! Per-item failures (bad dates, broken pages, missing fields) are logged and
//! the item is dropped. Only resource-level failures end the run with an error.

use crate::browser::Browser;
use crate::config::{Mode, ScraperConfig};
use crate::error::{CompletionError, DateParseError, RunError};
use crate::ingest::{Accepted, DocumentSink, Rejection, Restriction};
use crate::models::PublicationDocument;
use crate::scrapers::feed::{self, FeedSource};
use crate::scrapers::{complete, listing};
use tracing::{debug, error, info, instrument, warn};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The discovered sequence ran out.
    Exhausted,
    /// The sink signalled the end of the acceptance window.
    Finished(Restriction),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub discovered: usize,
    pub accepted: usize,
    pub duplicates: usize,
    /// Items lost to per-item errors.
    pub dropped: usize,
    /// Items outside a non-terminal restriction.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: Outcome,
    pub stats: RunStats,
}

/// Owns the browser session and feed source for the duration of a run.
#[derive(Debug)]
pub struct Discovery<B, F> {
    config: ScraperConfig,
    browser: B,
    feed: F,
}

impl<B: Browser, F: FeedSource> Discovery<B, F> {
    pub fn new(config: ScraperConfig, browser: B, feed: F) -> Self {
        Self {
            config,
            browser,
            feed,
        }
    }

    /// Give the browser back, e.g. to close its session.
    pub fn into_browser(self) -> B {
        self.browser
    }

    /// Discover, complete and forward publications until the sequence runs
    /// out or the sink closes the window.
    #[instrument(level = "info", skip_all, fields(mode = ?self.config.mode))]
    pub async fn run<S: DocumentSink>(&mut self, sink: &mut S) -> Result<RunReport, RunError> {
        let stubs = self.discover().await?;
        let mut stats = RunStats {
            discovered: stubs.len(),
            ..RunStats::default()
        };
        info!(count = stats.discovered, "Discovered publications");

        for stub in stubs {
            let mut doc = match stub {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "Skipping entry with unparseable date");
                    stats.dropped += 1;
                    continue;
                }
            };

            if let Err(Rejection::OutOfRange(restriction)) = sink.precheck(&doc) {
                if restriction.is_terminal() {
                    return Ok(finish(restriction, stats, &doc.link));
                }
                debug!(link = %doc.link, %restriction, "Outside window; not fetching");
                stats.skipped += 1;
                continue;
            }

            match complete::complete(&mut self.browser, &self.config, &mut doc).await {
                Ok(_) => {}
                Err(CompletionError::Browser(e)) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    error!(link = %doc.link, error = %e, "Dropping publication");
                    stats.dropped += 1;
                    continue;
                }
            }

            if doc.published.is_none() {
                warn!(link = %doc.link, "No publication date found; dropping");
                stats.dropped += 1;
                continue;
            }

            let link = doc.link.clone();
            match sink.accept(doc) {
                Ok(Accepted::Stored(id)) => {
                    debug!(%link, id, "Accepted publication");
                    stats.accepted += 1;
                }
                Ok(Accepted::Duplicate) => {
                    debug!(%link, "Publication already stored");
                    stats.duplicates += 1;
                }
                Err(Rejection::OutOfRange(restriction)) if restriction.is_terminal() => {
                    return Ok(finish(restriction, stats, &link));
                }
                Err(Rejection::OutOfRange(restriction)) => {
                    debug!(%link, %restriction, "Outside window; skipped");
                    stats.skipped += 1;
                }
            }
        }

        info!(?stats, "Publication sequence exhausted");
        Ok(RunReport {
            outcome: Outcome::Exhausted,
            stats,
        })
    }

    async fn discover(
        &mut self,
    ) -> Result<Vec<Result<PublicationDocument, DateParseError>>, RunError> {
        match self.config.mode {
            Mode::Feed => {
                let entries = self.feed.fetch_and_parse(&self.config.feed_url).await?;
                Ok(feed::discover(entries))
            }
            Mode::Listing => {
                let rows = listing::discover(&mut self.browser, &self.config).await?;
                Ok(rows.into_iter().map(|row| Ok(row.into())).collect())
            }
        }
    }
}

fn finish(restriction: Restriction, stats: RunStats, link: &str) -> RunReport {
    info!(%link, %restriction, "Document is out of range; finishing run");
    RunReport {
        outcome: Outcome::Finished(restriction),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::ScriptedBrowser;
    use crate::config::Timings;
    use crate::error::FeedError;
    use crate::ingest::{RestrictedSink, Restrictions};
    use crate::models::FeedEntry;
    use crate::scrapers::extract::fixtures::{ARTICLE, ARTICLE_BARE};
    use crate::scrapers::feed::fixtures::entry;
    use crate::scrapers::listing::fixtures::{INDEX_URL, LISTING};
    use chrono::{NaiveDate, NaiveDateTime};

    struct StaticFeed(Vec<FeedEntry>);

    impl FeedSource for StaticFeed {
        async fn fetch_and_parse(&self, _url: &str) -> Result<Vec<FeedEntry>, FeedError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenFeed;

    impl FeedSource for BrokenFeed {
        async fn fetch_and_parse(&self, _url: &str) -> Result<Vec<FeedEntry>, FeedError> {
            Err(feed::parse_feed("<nope/>").unwrap_err())
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn config(mode: Mode) -> ScraperConfig {
        ScraperConfig {
            mode,
            timings: Timings::immediate(),
            ..ScraperConfig::default()
        }
    }

    fn sink_from(from: NaiveDateTime) -> RestrictedSink {
        RestrictedSink::new(Restrictions {
            from_date: Some(from),
            ..Restrictions::default()
        })
    }

    const A: &str = "https://www.ecb.europa.eu/press/pr/date/2025/html/a.en.html";
    const B: &str = "https://www.ecb.europa.eu/press/pr/date/2025/html/b.en.html";
    const C: &str = "https://www.ecb.europa.eu/press/pr/date/2020/html/c.en.html";

    #[tokio::test]
    async fn test_feed_run_stops_at_recency_boundary() {
        let browser = ScriptedBrowser::new()
            .with_page(A, ARTICLE)
            .with_page(B, ARTICLE_BARE)
            .with_page(C, ARTICLE);
        let feed = StaticFeed(vec![
            entry("June", A, "2025-06-01"),
            entry("May", B, "2025-05-15"),
            entry("Old", C, "2020-01-01"),
        ]);
        let mut discovery = Discovery::new(config(Mode::Feed), browser, feed);
        let mut sink = sink_from(day(2024, 1, 1));

        let report = discovery.run(&mut sink).await.unwrap();
        assert_eq!(
            report.outcome,
            Outcome::Finished(Restriction::FromDate(day(2024, 1, 1)))
        );
        assert_eq!(report.stats.accepted, 2);

        let titles: Vec<&str> = sink.accepted().iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["June", "May"]);
        assert_eq!(sink.accepted()[0].published, Some(day(2025, 6, 1)));
        assert!(sink.accepted().iter().all(|d| d.text.is_some()));

        let browser = discovery.into_browser();
        assert_eq!(browser.navigations, vec![A.to_string(), B.to_string()]);
    }

    #[tokio::test]
    async fn test_feed_run_skips_bad_entries() {
        let browser = ScriptedBrowser::new()
            .with_page(A, ARTICLE)
            .with_page(C, ARTICLE_BARE)
            .with_broken_page(B);
        let feed = StaticFeed(vec![
            entry("bad date", A, "the other day"),
            entry("broken page", B, "2025-05-15"),
            entry("fine", C, "2025-05-01"),
        ]);
        let mut discovery = Discovery::new(config(Mode::Feed), browser, feed);
        let mut sink = RestrictedSink::new(Restrictions::default());

        let report = discovery.run(&mut sink).await.unwrap();
        assert_eq!(report.outcome, Outcome::Exhausted);
        assert_eq!(
            report.stats,
            RunStats {
                discovered: 3,
                accepted: 1,
                dropped: 2,
                ..RunStats::default()
            }
        );
        assert_eq!(sink.accepted()[0].title, "fine");
    }

    #[tokio::test]
    async fn test_missing_category_forwarded_without_other() {
        let browser = ScriptedBrowser::new().with_page(B, ARTICLE_BARE);
        let feed = StaticFeed(vec![entry("Speech", B, "2024-03-03")]);
        let mut discovery = Discovery::new(config(Mode::Feed), browser, feed);
        let mut sink = RestrictedSink::new(Restrictions::default());

        discovery.run(&mut sink).await.unwrap();
        let doc = &sink.accepted()[0];
        assert!(doc.other.is_none());
        assert_eq!(doc.id, Some(1));
        let json = serde_json::to_value(doc).unwrap();
        assert!(json.get("other").is_none());
    }

    #[tokio::test]
    async fn test_non_html_feed_entry_forwarded_unchanged() {
        let pdf = "https://www.ecb.europa.eu/pub/pdf/annex.en.pdf";
        let feed = StaticFeed(vec![entry("Annex", pdf, "2025-06-01")]);
        let mut discovery = Discovery::new(config(Mode::Feed), ScriptedBrowser::new(), feed);
        let mut sink = RestrictedSink::new(Restrictions::default());

        discovery.run(&mut sink).await.unwrap();
        let doc = &sink.accepted()[0];
        assert_eq!(doc.link, pdf);
        assert!(doc.text.is_none());
        assert!(doc.loaded.is_none());
        assert!(discovery.into_browser().navigations.is_empty());
    }

    #[tokio::test]
    async fn test_maximum_materials_finishes_run() {
        let feed = StaticFeed(vec![
            entry("a", "https://x/a.pdf", "2025-06-03"),
            entry("b", "https://x/b.pdf", "2025-06-02"),
            entry("c", "https://x/c.pdf", "2025-06-01"),
        ]);
        let mut discovery = Discovery::new(config(Mode::Feed), ScriptedBrowser::new(), feed);
        let mut sink = RestrictedSink::new(Restrictions {
            maximum_materials: Some(2),
            ..Restrictions::default()
        });

        let report = discovery.run(&mut sink).await.unwrap();
        assert_eq!(report.outcome, Outcome::Finished(Restriction::MaximumMaterials(2)));
        assert_eq!(sink.accepted().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_and_to_date_do_not_stop_the_run() {
        let feed = StaticFeed(vec![
            entry("future", "https://x/f.pdf", "2026-01-01"),
            entry("seen", "https://x/s.pdf", "2025-06-02"),
            entry("new", "https://x/n.pdf", "2025-06-01"),
        ]);
        let mut discovery = Discovery::new(config(Mode::Feed), ScriptedBrowser::new(), feed);
        let mut sink = RestrictedSink::new(Restrictions {
            to_date: Some(day(2025, 12, 31)),
            ..Restrictions::default()
        })
        .with_history(vec!["https://x/s.pdf".to_string()], 7);

        let report = discovery.run(&mut sink).await.unwrap();
        assert_eq!(report.outcome, Outcome::Exhausted);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.duplicates, 1);
        assert_eq!(sink.accepted()[0].id, Some(8));
    }

    #[tokio::test]
    async fn test_feed_failure_is_fatal() {
        let mut discovery = Discovery::new(config(Mode::Feed), ScriptedBrowser::new(), BrokenFeed);
        let mut sink = RestrictedSink::new(Restrictions::default());
        assert!(matches!(
            discovery.run(&mut sink).await,
            Err(RunError::Feed(FeedError::Xml(_)))
        ));
    }

    #[tokio::test]
    async fn test_lost_session_aborts_run() {
        let feed = StaticFeed(vec![entry("a", A, "2025-06-01")]);
        let browser = ScriptedBrowser::new().with_lost_session();
        let mut discovery = Discovery::new(config(Mode::Feed), browser, feed);
        let mut sink = RestrictedSink::new(Restrictions::default());

        let err = discovery.run(&mut sink).await.unwrap_err();
        assert!(matches!(err, RunError::Browser(_)));
        assert!(sink.accepted().is_empty());
    }

    #[tokio::test]
    async fn test_listing_run_end_to_end() {
        let browser = ScriptedBrowser::new()
            .with_page(INDEX_URL, LISTING)
            .with_page(
                "https://www.ecb.europa.eu/press/pr/date/2025/html/ecb.mp250612.en.html",
                ARTICLE,
            )
            .with_heights(&[Some(100.0), Some(250.0), Some(250.0)]);
        let listing = ScraperConfig {
            years: vec![2025, 2024],
            ..config(Mode::Listing)
        };
        let mut discovery = Discovery::new(listing, browser, StaticFeed(vec![]));
        let mut sink = sink_from(day(2024, 1, 1));

        let report = discovery.run(&mut sink).await.unwrap();
        assert_eq!(report.outcome, Outcome::Exhausted);
        // Article, PDF and a blog page whose URL serves nothing.
        assert_eq!(report.stats.discovered, 3);
        assert_eq!(report.stats.accepted, 2);
        assert_eq!(report.stats.dropped, 1);

        let accepted = sink.accepted();
        assert_eq!(accepted[0].title, "Monetary policy decisions");
        assert_eq!(accepted[0].category(), Some("Press release"));
        assert!(accepted[0].text.is_some());
        assert_eq!(accepted[1].link, "/pub/pdf/fsr/ecb.fsr202505.en.pdf");
        assert_eq!(accepted[1].title, "Financial Stability Review");
        assert_eq!(accepted[1].published, Some(day(2025, 5, 15)));
        assert!(accepted[1].text.is_none());

        let browser = discovery.into_browser();
        assert_eq!(browser.scrolls, 3);
    }

    #[tokio::test]
    async fn test_listing_row_without_date_is_dropped() {
        let page = r#"<div class="sort-wrapper"><dl>
            <dd><div class="title"><a href="/pub/pdf/undated.pdf">Undated</a></div></dd>
        </dl></div>"#;
        let browser = ScriptedBrowser::new().with_page(INDEX_URL, page);
        let mut discovery = Discovery::new(config(Mode::Listing), browser, StaticFeed(vec![]));
        let mut sink = RestrictedSink::new(Restrictions::default());

        let report = discovery.run(&mut sink).await.unwrap();
        assert_eq!(report.stats.dropped, 1);
        assert!(sink.accepted().is_empty());
    }
}
