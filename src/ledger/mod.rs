//! Duplicate detection.
//!
//! An entry counts as already processed when the ledger holds its URL or its
//! fingerprint. The ledger itself sits behind [`LedgerStore`] so the pipeline
//! runs the same against SQLite ([`sqlite::SqliteLedger`]) or an in-memory
//! store in tests. [`scan::OutputScanner`] is a second, independent check
//! over documents already written to the output directory.

pub mod scan;
pub mod sqlite;

use crate::error::LedgerError;
use crate::models::ProcessedRecord;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 8;

/// Short, deterministic hash of an article's title and URL.
pub fn fingerprint(title: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(url.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(FINGERPRINT_LEN);
    digest
}

/// A persistent record of processed entries, keyed by URL.
pub trait LedgerStore {
    fn contains_url(&self, url: &str) -> Result<bool, LedgerError>;
    fn contains_fingerprint(&self, fingerprint: &str) -> Result<bool, LedgerError>;
    /// Insert or replace the record for `url`.
    fn record(&self, url: &str, title: &str, fingerprint: &str) -> Result<(), LedgerError>;
    fn count(&self) -> Result<usize, LedgerError>;
    fn get(&self, url: &str) -> Result<Option<ProcessedRecord>, LedgerError>;
}

impl<T: LedgerStore> LedgerStore for &T {
    fn contains_url(&self, url: &str) -> Result<bool, LedgerError> {
        (**self).contains_url(url)
    }

    fn contains_fingerprint(&self, fingerprint: &str) -> Result<bool, LedgerError> {
        (**self).contains_fingerprint(fingerprint)
    }

    fn record(&self, url: &str, title: &str, fingerprint: &str) -> Result<(), LedgerError> {
        (**self).record(url, title, fingerprint)
    }

    fn count(&self) -> Result<usize, LedgerError> {
        (**self).count()
    }

    fn get(&self, url: &str) -> Result<Option<ProcessedRecord>, LedgerError> {
        (**self).get(url)
    }
}

/// Ledger lookups and writes with the pipeline's failure policy applied:
/// read errors count as "not processed", write errors are logged and dropped.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Exact URL match only; used before the page is fetched.
    pub fn seen_url(&self, url: &str) -> bool {
        self.store.contains_url(url).unwrap_or_else(|e| {
            warn!(%url, error = %e, "Ledger lookup failed; treating as new");
            false
        })
    }

    /// The stored row for `url`, if it can be read.
    pub fn record_for(&self, url: &str) -> Option<ProcessedRecord> {
        self.store.get(url).unwrap_or_else(|e| {
            warn!(%url, error = %e, "Ledger lookup failed");
            None
        })
    }

    /// URL match or fingerprint match.
    #[instrument(level = "debug", skip(self))]
    pub fn is_processed(&self, url: &str, fingerprint: &str) -> bool {
        if self.seen_url(url) {
            debug!("Ledger hit by URL");
            return true;
        }
        match self.store.contains_fingerprint(fingerprint) {
            Ok(hit) => {
                if hit {
                    debug!("Ledger hit by fingerprint");
                }
                hit
            }
            Err(e) => {
                warn!(error = %e, "Ledger fingerprint lookup failed; treating as new");
                false
            }
        }
    }

    /// Record an entry. Failures are logged and swallowed; losing a record only
    /// means a later run may process the entry again.
    pub fn mark_processed(&self, url: &str, title: &str, fingerprint: &str) {
        if let Err(e) = self.store.record(url, title, fingerprint) {
            warn!(%url, error = %e, "Failed to mark article as processed");
        }
    }

    /// Number of records, or `None` when the store cannot be read.
    pub fn len(&self) -> Option<usize> {
        self.store
            .count()
            .map_err(|e| warn!(error = %e, "Could not count ledger records"))
            .ok()
    }
}
