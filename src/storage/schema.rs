//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the news-wave database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl waves
CREATE TABLE IF NOT EXISTS waves (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    seed_url TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    tasks_attempted INTEGER NOT NULL DEFAULT 0,
    articles_inserted INTEGER NOT NULL DEFAULT 0
);

-- Ingested articles
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wave_id INTEGER REFERENCES waves(id),
    title TEXT NOT NULL,
    published_at TEXT NOT NULL,
    body TEXT NOT NULL,
    source TEXT NOT NULL,
    link TEXT NOT NULL,
    ingested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_link ON articles(link);
CREATE INDEX IF NOT EXISTS idx_articles_title_time ON articles(title, published_at);
CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source);
CREATE INDEX IF NOT EXISTS idx_articles_wave ON articles(wave_id);

-- Offloaded images, in document order per article
CREATE TABLE IF NOT EXISTS article_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles(id),
    position INTEGER NOT NULL,
    public_url TEXT NOT NULL,
    description TEXT NOT NULL,
    UNIQUE(article_id, position)
);

CREATE INDEX IF NOT EXISTS idx_article_images_article ON article_images(article_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
