//! ECB publication discovery and completion.
//!
//! Discovery runs in one of two modes, and completion follows either way:
//!
//! | Step | Module | Needs browser | Output |
//! |------|--------|---------------|--------|
//! | Listing discovery | [`listing`] | yes | [`ListingEntry`](crate::models::ListingEntry) rows |
//! | Feed discovery | [`feed`] | no | stubs with title, summary and date |
//! | Completion | [`complete`] | `.html` only | documents with full text |
//! | Field extraction | [`extract`] | no (page source) | [`PageFields`](extract::PageFields) |
//!
//! Both discovery modes yield newest-first sequences in site order. A failure
//! on one row or entry never stops the sequence.

pub mod complete;
pub mod extract;
pub mod feed;
pub mod listing;
