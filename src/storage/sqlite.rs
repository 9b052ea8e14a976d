//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ArticleStore trait.

use crate::article::{Article, Image};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, DedupKey, InsertReport, StoreError, StoreResult};
use crate::storage::{WaveRecord, WaveStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so one store can be shared by every
/// task of a wave.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::QueryFailed("connection lock poisoned".to_string()))
    }

    // ===== Wave Management =====

    /// Records the start of a wave and returns its ID
    pub fn create_wave(&self, seed_url: &str, config_hash: &str) -> StoreResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO waves (started_at, seed_url, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, seed_url, config_hash, WaveStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Marks a wave finished with its final counters
    pub fn finish_wave(
        &self,
        wave_id: i64,
        status: WaveStatus,
        tasks_attempted: u64,
        articles_inserted: u64,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE waves SET status = ?1, finished_at = ?2, tasks_attempted = ?3, articles_inserted = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                tasks_attempted as i64,
                articles_inserted as i64,
                wave_id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::WaveNotFound(wave_id));
        }
        Ok(())
    }

    /// Gets a wave by ID
    pub fn get_wave(&self, wave_id: i64) -> StoreResult<WaveRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, started_at, finished_at, seed_url, config_hash, status, tasks_attempted, articles_inserted
             FROM waves WHERE id = ?1",
            params![wave_id],
            row_to_wave,
        )
        .optional()?
        .ok_or(StoreError::WaveNotFound(wave_id))
    }

    /// Gets the most recent wave
    pub fn latest_wave(&self) -> StoreResult<Option<WaveRecord>> {
        let conn = self.lock()?;
        let wave = conn
            .query_row(
                "SELECT id, started_at, finished_at, seed_url, config_hash, status, tasks_attempted, articles_inserted
                 FROM waves ORDER BY id DESC LIMIT 1",
                [],
                row_to_wave,
            )
            .optional()?;
        Ok(wave)
    }

    // ===== Statistics =====

    pub fn count_articles(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM articles")
    }

    pub fn count_images(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM article_images")
    }

    pub fn count_waves(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM waves")
    }

    pub fn count_failed_waves(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM waves WHERE status = ?1",
            params![WaveStatus::Failed.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Article counts per source tag, largest first
    pub fn articles_by_source(&self) -> StoreResult<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) AS n FROM articles GROUP BY source ORDER BY n DESC, source",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Loads the most recently ingested article with the given link
    pub fn find_article(&self, link: &str) -> StoreResult<Option<Article>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, title, published_at, body, source, link FROM articles
                 WHERE link = ?1 ORDER BY id DESC LIMIT 1",
                params![link],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        Article {
                            title: row.get(1)?,
                            published_at: row.get(2)?,
                            body: row.get(3)?,
                            source: row.get(4)?,
                            link: row.get(5)?,
                            images: Vec::new(),
                        },
                    ))
                },
            )
            .optional()?;

        let Some((article_id, mut article)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT public_url, description FROM article_images
             WHERE article_id = ?1 ORDER BY position",
        )?;
        article.images = stmt
            .query_map(params![article_id], |row| {
                Ok(Image {
                    public_url: row.get(0)?,
                    description: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(article))
    }

    /// Number of articles inserted by `wave_id`
    pub fn count_wave_articles(&self, wave_id: i64) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE wave_id = ?1",
            params![wave_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn insert_articles(&self, wave_id: Option<i64>, articles: &[Article]) -> StoreResult<InsertReport> {
        if articles.is_empty() {
            return Ok(InsertReport::default());
        }

        let mut conn = self.lock()?;
        let inserted_count = insert_all(&mut conn, wave_id, articles)
            .map_err(|e| StoreError::InsertFailed(e.to_string()))?;

        Ok(InsertReport { inserted_count })
    }

    fn count(&self, sql: &str) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl ArticleStore for SqliteStorage {
    fn exists(&self, key: &DedupKey) -> StoreResult<bool> {
        let conn = self.lock()?;
        let found = match key {
            DedupKey::Link(link) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM articles WHERE link = ?1)",
                params![link],
                |row| row.get::<_, bool>(0),
            ),
            DedupKey::TitleTime { title, time } => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM articles WHERE title = ?1 AND published_at = ?2)",
                params![title, time],
                |row| row.get::<_, bool>(0),
            ),
        };
        found.map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    fn insert_many(&self, articles: &[Article]) -> StoreResult<InsertReport> {
        self.insert_articles(None, articles)
    }

    fn insert_wave(&self, wave_id: i64, articles: &[Article]) -> StoreResult<InsertReport> {
        self.insert_articles(Some(wave_id), articles)
    }
}

/// Writes every article in one transaction; dropping the transaction on error
/// rolls it back
fn insert_all(
    conn: &mut Connection,
    wave_id: Option<i64>,
    articles: &[Article],
) -> Result<usize, rusqlite::Error> {
    let tx = conn.transaction()?;
    let now = Utc::now().to_rfc3339();

    {
        let mut insert_article = tx.prepare(
            "INSERT INTO articles (wave_id, title, published_at, body, source, link, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut insert_image = tx.prepare(
            "INSERT INTO article_images (article_id, position, public_url, description)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        for article in articles {
            let article_id = insert_article.insert(params![
                wave_id,
                article.title,
                article.published_at,
                article.body,
                article.source,
                article.link,
                now
            ])?;

            for (position, image) in article.images.iter().enumerate() {
                insert_image.execute(params![
                    article_id,
                    position as i64,
                    image.public_url,
                    image.description
                ])?;
            }
        }
    }

    tx.commit()?;
    Ok(articles.len())
}

fn row_to_wave(row: &rusqlite::Row<'_>) -> rusqlite::Result<WaveRecord> {
    Ok(WaveRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        seed_url: row.get(3)?,
        config_hash: row.get(4)?,
        status: WaveStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(WaveStatus::Failed),
        tasks_attempted: row.get::<_, i64>(6)? as u64,
        articles_inserted: row.get::<_, i64>(7)? as u64,
    })
}
