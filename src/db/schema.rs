//! Database schema and types

use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS media_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    title TEXT NOT NULL,
    video_url TEXT NOT NULL,
    thumbnail_url TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_media_records_collection ON media_records(collection, id);
";

/// Metadata of one uploaded video, as pushed to the collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub title: String,
    #[serde(rename = "videoURL")]
    pub video_url: String,
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: String,
}

/// A media record as stored in SQLite
#[cfg(test)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMediaRecord {
    pub id: i64,
    pub collection: String,
    #[serde(flatten)]
    pub record: MediaRecord,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
