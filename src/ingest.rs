//! Hand-off of completed documents to the ingestion side.
//!
//! The pipeline forwards every completed document through
//! [`DocumentSink::accept`]. The sink decides whether the document is inside
//! the configured window, whether it is new, and assigns it an id.
//! An out-of-range answer is a normal outcome, not a failure: a terminal
//! [`Restriction`] tells the pipeline to stop the run.

use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::models::PublicationDocument;

/// Acceptance window for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restrictions {
    /// Oldest publication date accepted.
    pub from_date: Option<NaiveDateTime>,
    /// Newest publication date accepted.
    pub to_date: Option<NaiveDateTime>,
    /// Cap on documents accepted in one run.
    pub maximum_materials: Option<usize>,
    /// Stop at the first publication already stored by an earlier run.
    pub to_last_material: bool,
}

impl Default for Restrictions {
    fn default() -> Self {
        Self {
            from_date: None,
            to_date: None,
            maximum_materials: Some(50),
            to_last_material: false,
        }
    }
}

/// Which restriction a document violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    FromDate(NaiveDateTime),
    ToDate(NaiveDateTime),
    MaximumMaterials(usize),
    ToLastMaterial,
}

impl Restriction {
    /// Whether every later document in a newest-first sequence is out of range too.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Restriction::ToDate(_))
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Restriction::FromDate(d) => write!(f, "published before from_date `{d}`"),
            Restriction::ToDate(d) => write!(f, "published after to_date `{d}`"),
            Restriction::MaximumMaterials(n) => write!(f, "maximum of {n} materials reached"),
            Restriction::ToLastMaterial => write!(f, "reached last stored material"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted {
    /// Stored under the given id.
    Stored(u64),
    /// Already known; nothing stored.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange(Restriction),
}

/// Receiver of completed documents.
pub trait DocumentSink {
    fn accept(&mut self, doc: PublicationDocument) -> Result<Accepted, Rejection>;

    /// Cheap check on a stub before it is completed, so out-of-range
    /// publications are never fetched. Accepts everything by default.
    fn precheck(&self, _doc: &PublicationDocument) -> Result<(), Rejection> {
        Ok(())
    }
}

/// In-memory sink enforcing [`Restrictions`] and de-duplicating by link.
#[derive(Debug, Default)]
pub struct RestrictedSink {
    restrictions: Restrictions,
    known: HashSet<String>,
    next_id: u64,
    accepted: Vec<PublicationDocument>,
}

impl RestrictedSink {
    pub fn new(restrictions: Restrictions) -> Self {
        Self {
            restrictions,
            next_id: 1,
            ..Self::default()
        }
    }

    /// Seed with links and the id counter left by earlier runs.
    pub fn with_history(mut self, links: impl IntoIterator<Item = String>, last_id: u64) -> Self {
        self.known.extend(links);
        self.next_id = last_id + 1;
        self
    }

    pub fn accepted(&self) -> &[PublicationDocument] {
        &self.accepted
    }

    pub fn into_accepted(self) -> Vec<PublicationDocument> {
        self.accepted
    }

    fn check_dates(&self, doc: &PublicationDocument) -> Result<(), Rejection> {
        let r = &self.restrictions;
        if let (Some(from), Some(published)) = (r.from_date, doc.published) {
            if published < from {
                return Err(Rejection::OutOfRange(Restriction::FromDate(from)));
            }
        }
        if let (Some(to), Some(published)) = (r.to_date, doc.published) {
            if published > to {
                return Err(Rejection::OutOfRange(Restriction::ToDate(to)));
            }
        }
        Ok(())
    }
}

impl DocumentSink for RestrictedSink {
    fn precheck(&self, doc: &PublicationDocument) -> Result<(), Rejection> {
        self.check_dates(doc)
    }

    fn accept(&mut self, mut doc: PublicationDocument) -> Result<Accepted, Rejection> {
        self.check_dates(&doc)?;
        let r = &self.restrictions;
        if self.known.contains(&doc.link) {
            if r.to_last_material {
                return Err(Rejection::OutOfRange(Restriction::ToLastMaterial));
            }
            debug!(link = %doc.link, "Already stored");
            return Ok(Accepted::Duplicate);
        }
        if let Some(max) = r.maximum_materials {
            if self.accepted.len() >= max {
                return Err(Rejection::OutOfRange(Restriction::MaximumMaterials(max)));
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        doc.id = Some(id);
        self.known.insert(doc.link.clone());
        self.accepted.push(doc);
        Ok(Accepted::Stored(id))
    }
}
