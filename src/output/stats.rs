//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! store statistics for the `--stats` mode.

use crate::storage::{SqliteStorage, StoreResult, WaveRecord};

/// Article store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of articles stored
    pub total_articles: u64,

    /// Total number of offloaded images stored
    pub total_images: u64,

    /// Number of waves recorded
    pub total_waves: u64,

    /// Number of waves whose flush failed
    pub failed_waves: u64,

    /// Article counts per source tag, largest first
    pub articles_by_source: Vec<(String, u64)>,

    /// Most recent wave, if any
    pub latest_wave: Option<WaveRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &SqliteStorage) -> StoreResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_articles: storage.count_articles()?,
        total_images: storage.count_images()?,
        total_waves: storage.count_waves()?,
        failed_waves: storage.count_failed_waves()?,
        articles_by_source: storage.articles_by_source()?,
        latest_wave: storage.latest_wave()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Articles: {}", stats.total_articles);
    println!("  Images: {}", stats.total_images);
    println!(
        "  Waves: {} ({} failed)",
        stats.total_waves, stats.failed_waves
    );
    println!();

    if !stats.articles_by_source.is_empty() {
        println!("Articles by Source:");
        for (source, count) in &stats.articles_by_source {
            let percentage = if stats.total_articles > 0 {
                (*count as f64 / stats.total_articles as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", source, count, percentage);
        }
        println!();
    }

    if let Some(wave) = &stats.latest_wave {
        println!("Latest Wave:");
        println!("  ID: {}", wave.id);
        println!("  Seed: {}", wave.seed_url);
        println!("  Started: {}", wave.started_at);
        if let Some(finished) = &wave.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", wave.status.to_db_string());
        println!("  Tasks attempted: {}", wave.tasks_attempted);
        println!("  Articles inserted: {}", wave.articles_inserted);
    }
}
