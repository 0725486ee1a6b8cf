//! Free-text timestamp normalization.
//!
//! Everything the scraper compares against the sink's recency boundary goes
//! through [`normalize`], which yields a timezone-naive [`NaiveDateTime`].
//! Offsets are dropped by keeping the wall-clock time printed in the source
//! string, so a feed `pubDate` of `Thu, 12 Jun 2025 14:30:00 +0200` becomes
//! `2025-06-12T14:30:00`.

use crate::error::DateParseError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Zone names the feed prints instead of a numeric offset.
const ZONE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("CET", "+0100"),
    ("CEST", "+0200"),
    ("EET", "+0200"),
    ("EEST", "+0300"),
    ("WET", "+0000"),
    ("WEST", "+0100"),
    ("BST", "+0100"),
    ("UTC", "+0000"),
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%d %B %Y",     // 12 June 2025 (ECB publication label)
    "%A, %d %B %Y", // Thursday, 12 June 2025
    "%B %d, %Y",    // June 12, 2025
    "%d %b %Y",     // 12 Jun 2025
    "%Y-%m-%d",     // 2025-06-12 (listing isodate)
    "%d/%m/%Y",
    "%d.%m.%Y",
];

/// Parse a free-text date or date-time into a naive point in time.
///
/// Date-only inputs land at midnight.
pub fn normalize(input: &str) -> Result<NaiveDateTime, DateParseError> {
    let cleaned = input.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return Ok(dt.naive_local());
    }
    if let Some(numeric) = with_numeric_zone(&cleaned) {
        if let Ok(dt) = DateTime::parse_from_rfc2822(&numeric) {
            return Ok(dt.naive_local());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Ok(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Ok(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }

    Err(DateParseError {
        input: input.to_string(),
    })
}

/// Swap a trailing zone abbreviation for its offset.
fn with_numeric_zone(cleaned: &str) -> Option<String> {
    let (rest, zone) = cleaned.rsplit_once(' ')?;
    ZONE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| zone.eq_ignore_ascii_case(name))
        .map(|(_, offset)| format!("{rest} {offset}"))
}
