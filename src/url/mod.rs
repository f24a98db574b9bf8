//! URL normalization and crawl scope rules
//!
//! Normalization gives every target a single canonical spelling so the
//! frontier's one-active-task-per-URL invariant and URL fingerprints both work
//! off the same identity. Scope rules decide which discovered hosts the crawl
//! is allowed to follow.

mod normalize;
mod scope;

pub use normalize::normalize_url;
pub use scope::ScopeFilter;

use url::Url;

/// Extracts the lowercased host from a URL, if present.
///
/// The host is the rate-limiting unit: every token bucket and politeness
/// decision is keyed by this value.
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
