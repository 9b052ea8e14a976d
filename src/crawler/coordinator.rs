//! Crawler coordinator - wave orchestration logic
//!
//! This module wires the collaborators of a wave together and runs it:
//! - Initializing storage, the HTTP client, and the image backend
//! - Recording the wave in the database
//! - Running the scheduler and flushing its articles
//! - Logging the summary and writing the optional report

use crate::config::Config;
use crate::crawler::dedup::DedupGate;
use crate::crawler::extractor::ArticleExtractor;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::scheduler::{SchedulerLimits, WaveScheduler};
use crate::media::{build_backend, MediaOffloader};
use crate::output::{write_wave_report, ResultSink, WaveSummary};
use crate::storage::{open_storage, ArticleStore, SqliteStorage, WaveStatus};
use crate::url::{normalize_url, LinkFilter};
use crate::CrawlerError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    storage: Arc<SqliteStorage>,
    scheduler: WaveScheduler,
    sink: ResultSink,
    seed: Url,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Everything a wave needs is resolved here, so a bad selector, seed URL,
    /// or storage setting fails before any crawling starts.
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self, CrawlerError> {
        let storage = Arc::new(open_storage(Path::new(&config.output.database_path))?);
        let store: Arc<dyn ArticleStore> = storage.clone();

        let client = build_http_client(&config.user_agent)?;
        let backend = build_backend(&config.storage)?;
        let offloader = MediaOffloader::new(client.clone(), backend);
        tracing::debug!("Image backend: {}", offloader.backend_name());

        let extractor = ArticleExtractor::new(&config.extractor)?;
        let seed = normalize_url(&config.crawler.seed_url)?;

        let gate = DedupGate::new(
            store.clone(),
            config.crawler.dedup_key,
            config.crawler.query_failure_policy,
        );

        let scheduler = WaveScheduler::new(
            client,
            extractor,
            offloader,
            gate,
            LinkFilter::new(config.crawler.link_marker.clone()),
            config.crawler.source.clone(),
            SchedulerLimits::from_config(&config.crawler),
        );

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            storage,
            scheduler,
            sink: ResultSink::new(store),
            seed,
        })
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Runs one wave from the seed URL to the bulk insert
    ///
    /// A failed flush marks the wave failed in the returned summary; only
    /// failures to record the wave itself are returned as errors.
    pub async fn run_wave(&self) -> Result<WaveSummary, CrawlerError> {
        let wave_id = self
            .storage
            .create_wave(self.seed.as_str(), &self.config_hash)?;
        let limits = self.scheduler.limits();
        tracing::info!(
            "Starting wave {} from {} (depth {}, {} slots, {}s deadline)",
            wave_id,
            self.seed,
            limits.max_depth,
            limits.max_concurrent_tasks,
            limits.wave_deadline.as_secs()
        );

        let outcome = self.scheduler.run(&self.seed).await;

        let report_articles = match &self.config.output.summary_path {
            Some(_) => outcome.articles.clone(),
            None => Vec::new(),
        };

        let (inserted, flush_error) = match self.sink.flush(wave_id, outcome.articles) {
            Ok(report) => (report.inserted_count, None),
            Err(e) => {
                tracing::error!("Flush failed for wave {}: {}", wave_id, e);
                (0, Some(e.to_string()))
            }
        };

        let summary = WaveSummary::new(
            wave_id,
            self.seed.as_str(),
            &outcome.stats,
            outcome.elapsed,
            inserted,
            flush_error,
        );

        let status = if summary.is_failed() {
            WaveStatus::Failed
        } else {
            WaveStatus::Completed
        };
        self.storage.finish_wave(
            wave_id,
            status,
            summary.tasks_attempted as u64,
            summary.articles_inserted as u64,
        )?;

        summary.log();

        if let Some(path) = &self.config.output.summary_path {
            match write_wave_report(&summary, &report_articles, Path::new(path)) {
                Ok(()) => tracing::info!("Wave report written to {}", path),
                Err(e) => tracing::warn!("Failed to write wave report to {}: {}", path, e),
            }
        }

        Ok(summary)
    }

    /// Runs `waves` waves, sleeping `interval` between them
    pub async fn run_waves(
        &self,
        waves: u32,
        interval: Duration,
    ) -> Result<Vec<WaveSummary>, CrawlerError> {
        let mut summaries = Vec::with_capacity(waves as usize);

        for n in 0..waves {
            if n > 0 && !interval.is_zero() {
                tracing::debug!("Sleeping {:?} before next wave", interval);
                tokio::time::sleep(interval).await;
            }
            summaries.push(self.run_wave().await?);
        }

        Ok(summaries)
    }
}

/// Runs a complete crawl operation
///
/// # Returns
///
/// * `Ok(summaries)` - One summary per wave, failed waves included
/// * `Err(CrawlerError)` - Setup failed or a wave could not be recorded
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    waves: u32,
    interval: Duration,
) -> Result<Vec<WaveSummary>, CrawlerError> {
    let coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run_waves(waves, interval).await
}
