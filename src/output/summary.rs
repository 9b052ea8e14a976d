//! Per-wave summary

use crate::crawler::WaveStats;
use crate::storage::WaveStatus;
use serde::Serialize;
use std::time::Duration;

/// Everything reported about one finished wave
///
/// Attempted and succeeded counts are always present, so a partially failed
/// wave is visible as such.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveSummary {
    pub wave_id: i64,
    pub seed_url: String,
    pub status: String,
    pub tasks_scheduled: usize,
    pub tasks_attempted: usize,
    pub tasks_abandoned: usize,
    pub task_failures: usize,
    pub fetch_failures: usize,
    pub query_failures: usize,
    pub articles_extracted: usize,
    pub skipped_existing: usize,
    pub links_dropped: usize,
    pub images_stored: usize,
    pub offload_failures: usize,
    pub articles_inserted: usize,
    pub peak_running: usize,
    pub elapsed_ms: u64,
    pub flush_error: Option<String>,
}

impl WaveSummary {
    pub fn new(
        wave_id: i64,
        seed_url: &str,
        stats: &WaveStats,
        elapsed: Duration,
        articles_inserted: usize,
        flush_error: Option<String>,
    ) -> Self {
        let status = if flush_error.is_some() {
            WaveStatus::Failed
        } else {
            WaveStatus::Completed
        };

        Self {
            wave_id,
            seed_url: seed_url.to_string(),
            status: status.to_db_string().to_string(),
            tasks_scheduled: stats.tasks_scheduled,
            tasks_attempted: stats.tasks_attempted,
            tasks_abandoned: stats.tasks_abandoned,
            task_failures: stats.task_failures,
            fetch_failures: stats.fetch_failures,
            query_failures: stats.query_failures,
            articles_extracted: stats.articles_extracted,
            skipped_existing: stats.skipped_existing,
            links_dropped: stats.links_dropped,
            images_stored: stats.images_stored,
            offload_failures: stats.offload_failures,
            articles_inserted,
            peak_running: stats.peak_running,
            elapsed_ms: elapsed.as_millis() as u64,
            flush_error,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == WaveStatus::Failed.to_db_string()
    }

    /// Percentage of attempted tasks that produced an article
    pub fn success_rate(&self) -> f64 {
        if self.tasks_attempted == 0 {
            0.0
        } else {
            (self.articles_extracted as f64 / self.tasks_attempted as f64) * 100.0
        }
    }

    /// Emits the wave summary event
    pub fn log(&self) {
        tracing::info!(
            wave_id = self.wave_id,
            status = %self.status,
            scheduled = self.tasks_scheduled,
            attempted = self.tasks_attempted,
            abandoned = self.tasks_abandoned,
            fetch_failures = self.fetch_failures,
            extracted = self.articles_extracted,
            skipped_existing = self.skipped_existing,
            links_dropped = self.links_dropped,
            images_stored = self.images_stored,
            offload_failures = self.offload_failures,
            inserted = self.articles_inserted,
            peak_running = self.peak_running,
            elapsed_ms = self.elapsed_ms,
            "Wave {} finished: {} tasks attempted, {} articles inserted",
            self.wave_id,
            self.tasks_attempted,
            self.articles_inserted
        );
    }
}
