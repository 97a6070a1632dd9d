//! Database module
//!
//! Append-only persistence for media records.

mod schema;

pub use schema::*;

use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Media Operations ====================

    /// Append a record to a collection, returning its row id
    pub fn append_media(&self, collection: &str, record: &MediaRecord) -> DbResult<i64> {
        let conn = self.lock();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO media_records (collection, title, video_url, thumbnail_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                collection,
                record.title,
                record.video_url,
                record.thumbnail_url,
                now.to_rfc3339()
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// All records of a collection in insertion order
    #[cfg(test)]
    pub fn list_media(&self, collection: &str) -> DbResult<Vec<StoredMediaRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, collection, title, video_url, thumbnail_url, created_at
             FROM media_records
             WHERE collection = ?1
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![collection], |row| {
            Ok(StoredMediaRecord {
                id: row.get(0)?,
                collection: row.get(1)?,
                record: MediaRecord {
                    title: row.get(2)?,
                    video_url: row.get(3)?,
                    thumbnail_url: row.get(4)?,
                },
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

#[cfg(test)]
fn parse_datetime(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
