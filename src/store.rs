//! URL and category persistence.
//!
//! A SQLite database tracks which fetched URLs have been turned into blog
//! posts, so each source article is processed at most once. There is no
//! cross-restart exactly-once guarantee: a crash between generation and the
//! mark-processed step leaves the URL pending and it will be re-attempted.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::PublishedRecord;

const MIGRATIONS: &str = "
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_url TEXT NOT NULL,
    fetched_url TEXT NOT NULL UNIQUE,
    processed INTEGER NOT NULL DEFAULT 0,
    categories TEXT,
    blog_url TEXT,
    written_at TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL COLLATE NOCASE UNIQUE
);
";

/// A pending row: the URL to process and the categories assigned at enqueue
/// time.
#[derive(Debug, Clone)]
pub struct PendingUrl {
    pub url: String,
    pub categories: Vec<String>,
}

/// Persistence seam consumed by the pipeline.
pub trait UrlStore {
    /// URLs not yet turned into posts, in insertion order.
    fn pending(&self) -> Result<Vec<PendingUrl>, StoreError>;

    /// Enqueue a fetched URL. Returns `false` when it was already known.
    fn add_url(
        &self,
        source_url: &str,
        fetched_url: &str,
        categories: &[String],
    ) -> Result<bool, StoreError>;

    /// Mark a URL processed with its final category assignment.
    fn mark_processed(&self, fetched_url: &str, categories: &[String]) -> Result<(), StoreError>;

    /// Record the published post link and timestamp for a URL.
    fn mark_published(&self, fetched_url: &str, blog_url: &str) -> Result<(), StoreError>;

    /// All processed rows, for the `posts` listing.
    fn published(&self) -> Result<Vec<PublishedRecord>, StoreError>;

    /// Current valid category names.
    fn categories(&self) -> Result<Vec<String>, StoreError>;

    /// Add a category name; duplicates (case-insensitive) are ignored.
    fn add_category(&self, name: &str) -> Result<(), StoreError>;
}

/// SQLite-backed [`UrlStore`].
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and migrate) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(MIGRATIONS)?;
        info!(path = %path.display(), "opened url store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(MIGRATIONS)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn join_categories(categories: &[String]) -> String {
    categories.join(", ")
}

fn split_categories(joined: Option<String>) -> Vec<String> {
    joined
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl UrlStore for SqliteStore {
    fn pending(&self) -> Result<Vec<PendingUrl>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached("SELECT fetched_url, categories FROM urls WHERE processed = 0 ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(PendingUrl {
                url: row.get(0)?,
                categories: split_categories(row.get(1)?),
            })
        })?;
        let mut pending = Vec::new();
        for row in rows {
            pending.push(row?);
        }
        Ok(pending)
    }

    fn add_url(
        &self,
        source_url: &str,
        fetched_url: &str,
        categories: &[String],
    ) -> Result<bool, StoreError> {
        let conn = self.lock();
        let existing: Option<i64> = conn
            .prepare_cached("SELECT id FROM urls WHERE fetched_url = ?1")?
            .query_row(params![fetched_url], |row| row.get(0))
            .optional()?;
        if existing.is_some() {
            debug!(url = %fetched_url, "url already enqueued; skipping");
            return Ok(false);
        }
        conn.prepare_cached(
            "INSERT INTO urls (source_url, fetched_url, categories, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?
        .execute(params![
            source_url,
            fetched_url,
            join_categories(categories),
            Utc::now().to_rfc3339(),
        ])?;
        Ok(true)
    }

    fn mark_processed(&self, fetched_url: &str, categories: &[String]) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.prepare_cached("UPDATE urls SET processed = 1, categories = ?1 WHERE fetched_url = ?2")?
            .execute(params![join_categories(categories), fetched_url])?;
        Ok(())
    }

    fn mark_published(&self, fetched_url: &str, blog_url: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.prepare_cached(
            "UPDATE urls SET blog_url = ?1, written_at = ?2 WHERE fetched_url = ?3",
        )?
        .execute(params![blog_url, Utc::now().to_rfc3339(), fetched_url])?;
        Ok(())
    }

    fn published(&self) -> Result<Vec<PublishedRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT source_url, fetched_url, blog_url, categories, written_at
             FROM urls WHERE processed = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PublishedRecord {
                source_url: row.get(0)?,
                fetched_url: row.get(1)?,
                blog_url: row.get(2)?,
                categories: split_categories(row.get(3)?),
                written_at: row.get(4)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn categories(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached("SELECT name FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn add_category(&self, name: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.prepare_cached("INSERT OR IGNORE INTO categories (name) VALUES (?1)")?
            .execute(params![name])?;
        Ok(())
    }
}
