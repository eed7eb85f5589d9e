//! Error types for the ledger and for per-article processing.
//!
//! External-call plumbing (HTTP, generation API, image host) returns
//! `Box<dyn Error>`; these enums classify failures where the pipeline needs to
//! tell them apart.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single entry could not be turned into an artifact.
///
/// None of these stop the run; the entry is counted as failed.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Scraping error: {0}")]
    Scrape(String),

    #[error("Rewrite error: {0}")]
    Rewrite(String),

    #[error("No generation API key configured")]
    MissingApiKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
