//! SQLite-backed ledger.

use crate::error::LedgerError;
use crate::ledger::LedgerStore;
use crate::models::ProcessedRecord;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS processed_articles (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    url            TEXT UNIQUE,
    title          TEXT,
    hash           TEXT,
    processed_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_processed_articles_hash ON processed_articles(hash);
";

/// Ledger stored in a single SQLite file, one process at a time.
#[derive(Debug)]
pub struct SqliteLedger {
    conn: Connection,
    path: PathBuf,
}

impl SqliteLedger {
    /// Open (or create) the ledger file and make sure the table exists.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "Opened ledger");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for SqliteLedger {
    fn contains_url(&self, url: &str) -> Result<bool, LedgerError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM processed_articles WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn contains_fingerprint(&self, fingerprint: &str) -> Result<bool, LedgerError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM processed_articles WHERE hash = ?1",
            params![fingerprint],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn record(&self, url: &str, title: &str, fingerprint: &str) -> Result<(), LedgerError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO processed_articles (url, title, hash) VALUES (?1, ?2, ?3)",
            params![url, title, fingerprint],
        )?;
        Ok(())
    }

    fn count(&self) -> Result<usize, LedgerError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM processed_articles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn get(&self, url: &str) -> Result<Option<ProcessedRecord>, LedgerError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, url, title, hash, processed_date FROM processed_articles WHERE url = ?1",
                params![url],
                |row| {
                    Ok(ProcessedRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        fingerprint: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        processed_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Ledger, fingerprint};

    #[test]
    fn test_record_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteLedger::open(&dir.path().join("ledger.db")).unwrap();
        store.record("https://b/entry/1", "제목", "abcd1234").unwrap();

        assert!(store.contains_url("https://b/entry/1").unwrap());
        assert!(!store.contains_url("https://b/entry/2").unwrap());
        assert!(store.contains_fingerprint("abcd1234").unwrap());
        assert_eq!(store.count().unwrap(), 1);

        let record = store.get("https://b/entry/1").unwrap().unwrap();
        assert_eq!(record.title, "제목");
        assert_eq!(record.fingerprint, "abcd1234");
        assert!(!record.processed_at.is_empty());
    }

    #[test]
    fn test_insert_or_replace_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteLedger::open(&dir.path().join("ledger.db")).unwrap();
        store.record("https://b/entry/1", "old", "aaaa0000").unwrap();
        store.record("https://b/entry/1", "new", "bbbb0000").unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get("https://b/entry/1").unwrap().unwrap().title, "new");
        assert!(!store.contains_fingerprint("aaaa0000").unwrap());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/ledger.db");
        {
            let ledger = Ledger::new(SqliteLedger::open(&path).unwrap());
            let fp = fingerprint("t", "https://b/entry/1");
            ledger.mark_processed("https://b/entry/1", "t", &fp);
        }
        let ledger = Ledger::new(SqliteLedger::open(&path).unwrap());
        assert!(ledger.seen_url("https://b/entry/1"));
        assert_eq!(ledger.len(), Some(1));
        assert_eq!(ledger.store().path(), path.as_path());
    }
}
