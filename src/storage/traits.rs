//! Storage traits and error types
//!
//! This module defines the narrow interface the crawl engine consumes from the
//! persistent article store.

use crate::article::Article;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Existence query failed: {0}")]
    QueryFailed(String),

    #[error("Bulk insert failed: {0}")]
    InsertFailed(String),

    #[error("Wave not found: {0}")]
    WaveNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Key used to test whether an article was ingested by an earlier wave
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Canonical article link
    Link(String),

    /// Headline and site-provided timestamp
    TitleTime { title: String, time: String },
}

impl DedupKey {
    /// Human-readable form for log events
    pub fn describe(&self) -> String {
        match self {
            Self::Link(link) => link.clone(),
            Self::TitleTime { title, time } => format!("{} @ {}", title, time),
        }
    }
}

/// Result of one bulk write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted_count: usize,
}

/// Trait for persistent article stores
///
/// Implementations are shared between concurrent crawl tasks and must be safe
/// to call from several of them at once.
pub trait ArticleStore: Send + Sync {
    /// Returns true if an article matching `key` already exists
    fn exists(&self, key: &DedupKey) -> StoreResult<bool>;

    /// Inserts all `articles` in one write
    ///
    /// Either every article is written or none is; a failure is reported as
    /// [`StoreError::InsertFailed`].
    fn insert_many(&self, articles: &[Article]) -> StoreResult<InsertReport>;

    /// Inserts all `articles` in one write, recording the wave that found them
    ///
    /// Stores that do not track waves fall back to [`ArticleStore::insert_many`].
    fn insert_wave(&self, _wave_id: i64, articles: &[Article]) -> StoreResult<InsertReport> {
        self.insert_many(articles)
    }
}
