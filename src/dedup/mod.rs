//! Fingerprint deduplication
//!
//! A record's fingerprint is checked and marked in one atomic step: the
//! in-memory set and the durable mark are updated under the same lock, so two
//! workers extracting the same record concurrently cannot both see "novel".
//! The records table's UNIQUE fingerprint constraint backstops the rare crash
//! between mark and append.

use crate::extract::RecordFields;
use crate::store::{SqliteStore, Store, StoreResult};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use url::Url;

/// Outcome of a dedup check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// First sighting; the caller must append the record
    Novel,
    /// Already seen; the caller drops the record
    Duplicate,
}

/// Shared dedup state: an in-memory seen-set backed by durable marks
pub struct Deduplicator {
    seen: Mutex<HashSet<String>>,
    store: Arc<Mutex<SqliteStore>>,
}

impl Deduplicator {
    /// Creates a deduplicator, seeding the in-memory set from the store's
    /// durable marks so resumed runs do not re-emit old records
    pub fn new(store: Arc<Mutex<SqliteStore>>) -> StoreResult<Self> {
        let seen = {
            let guard = store.lock().unwrap();
            guard.load_fingerprints()?.into_iter().collect()
        };
        Ok(Self {
            seen: Mutex::new(seen),
            store,
        })
    }

    /// Checks a fingerprint and, when novel, durably marks it before
    /// returning. The seen-set lock is held across the store write so a
    /// concurrent check of the same fingerprint waits for the verdict.
    pub fn check_and_mark(&self, fingerprint: &str) -> StoreResult<DedupDecision> {
        let mut seen = self.seen.lock().unwrap();
        if !seen.insert(fingerprint.to_string()) {
            return Ok(DedupDecision::Duplicate);
        }

        let marked = {
            let mut store = self.store.lock().unwrap();
            store.mark_fingerprint(fingerprint)
        };

        match marked {
            Ok(true) => Ok(DedupDecision::Novel),
            // Marked durably in an earlier run but missing from the set; the
            // set entry we just added is correct, the record is a duplicate.
            Ok(false) => Ok(DedupDecision::Duplicate),
            Err(e) => {
                // Roll back so a retry of the task re-checks cleanly.
                seen.remove(fingerprint);
                Err(e)
            }
        }
    }

    /// Number of distinct fingerprints seen so far
    pub fn seen_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// Fingerprint for URL-identity dedup: the SHA-256 of the normalized URL
pub fn fingerprint_url(url: &Url) -> String {
    hex_digest(url.as_str().as_bytes())
}

/// Fingerprint for content-identity dedup: the SHA-256 of the record's
/// canonical (sorted-key) JSON serialization
pub fn fingerprint_fields(fields: &RecordFields) -> String {
    // BTreeMap serializes with sorted keys, so equal field mappings always
    // produce equal fingerprints.
    let canonical = serde_json::to_string(fields).unwrap_or_default();
    hex_digest(canonical.as_bytes())
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deduplicator() -> Deduplicator {
        let store = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));
        Deduplicator::new(store).unwrap()
    }

    #[test]
    fn first_sighting_is_novel_then_duplicate() {
        let dedup = deduplicator();
        assert_eq!(dedup.check_and_mark("fp-1").unwrap(), DedupDecision::Novel);
        assert_eq!(
            dedup.check_and_mark("fp-1").unwrap(),
            DedupDecision::Duplicate
        );
        assert_eq!(dedup.seen_count(), 1);
    }

    #[test]
    fn distinct_fingerprints_are_independent() {
        let dedup = deduplicator();
        assert_eq!(dedup.check_and_mark("fp-1").unwrap(), DedupDecision::Novel);
        assert_eq!(dedup.check_and_mark("fp-2").unwrap(), DedupDecision::Novel);
    }

    #[test]
    fn marks_survive_into_a_new_deduplicator() {
        let store = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));

        let first = Deduplicator::new(Arc::clone(&store)).unwrap();
        assert_eq!(first.check_and_mark("fp-1").unwrap(), DedupDecision::Novel);
        drop(first);

        // Same backing store: the fingerprint is still known.
        let second = Deduplicator::new(store).unwrap();
        assert_eq!(
            second.check_and_mark("fp-1").unwrap(),
            DedupDecision::Duplicate
        );
    }

    #[test]
    fn concurrent_checks_admit_exactly_one() {
        let dedup = Arc::new(deduplicator());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let d = Arc::clone(&dedup);
            handles.push(std::thread::spawn(move || {
                d.check_and_mark("fp-racy").unwrap() == DedupDecision::Novel
            }));
        }

        let novel = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|novel| *novel)
            .count();
        assert_eq!(novel, 1);
    }

    #[test]
    fn url_fingerprints_differ_by_url() {
        let a = fingerprint_url(&Url::parse("https://a.test/1").unwrap());
        let b = fingerprint_url(&Url::parse("https://a.test/2").unwrap());
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn field_fingerprints_are_order_insensitive() {
        let mut first = RecordFields::new();
        first.insert("b".to_string(), "2".to_string());
        first.insert("a".to_string(), "1".to_string());

        let mut second = RecordFields::new();
        second.insert("a".to_string(), "1".to_string());
        second.insert("b".to_string(), "2".to_string());

        assert_eq!(fingerprint_fields(&first), fingerprint_fields(&second));
    }

    #[test]
    fn field_fingerprints_differ_by_value() {
        let mut first = RecordFields::new();
        first.insert("a".to_string(), "1".to_string());
        let mut second = RecordFields::new();
        second.insert("a".to_string(), "2".to_string());

        assert_ne!(fingerprint_fields(&first), fingerprint_fields(&second));
    }
}
