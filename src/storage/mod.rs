//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Article existence checks for the deduplication gate
//! - Bulk article inserts for the result sink
//! - Wave tracking and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ArticleStore, DedupKey, InsertReport, StoreError, StoreResult};

use std::path::Path;

/// Opens (or creates) the article database at `path`
pub fn open_storage(path: &Path) -> StoreResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl wave in the database
#[derive(Debug, Clone)]
pub struct WaveRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub seed_url: String,
    pub config_hash: String,
    pub status: WaveStatus,
    pub tasks_attempted: u64,
    pub articles_inserted: u64,
}

/// Status of a crawl wave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveStatus {
    Running,
    Completed,
    Failed,
}

impl WaveStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
