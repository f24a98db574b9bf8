//! Pluggable record extraction
//!
//! The engine treats extraction as a function from a fetched body to records
//! plus discovered follow-up URLs. Which fields mean what for a given target
//! is the extractor's business; the engine only routes its output through
//! dedup, persistence and the frontier.

mod html;

pub use html::HtmlExtractor;

use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Field mapping for one extracted record.
///
/// A `BTreeMap` keeps the serialization canonical (sorted keys), which makes
/// content fingerprints stable across runs.
pub type RecordFields = BTreeMap<String, String>;

/// Everything an extractor pulled out of one fetched document
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Zero or more structured records
    pub records: Vec<RecordFields>,
    /// Zero or more discovered URLs, possibly relative to the source
    pub links: Vec<String>,
}

/// Extraction failed for this document.
///
/// Not a task failure: the fetch itself worked, so the task still completes;
/// the record is skipped and the error logged.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExtractError(pub String);

/// Strategy interface for turning a fetched document into records and links.
///
/// Selected at engine construction time; implementations must be shareable
/// across workers.
pub trait Extractor: Send + Sync {
    fn extract(&self, source: &Url, body: &str) -> Result<Extraction, ExtractError>;
}
