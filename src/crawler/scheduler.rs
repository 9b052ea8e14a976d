//! Wave scheduler for bounded-concurrency crawling
//!
//! This module handles:
//! - Running one crawl wave from a seed URL down to a maximum depth
//! - Global concurrency limiting via a semaphore of worker slots
//! - The per-wave seen-set and link-level deduplication
//! - Admission cut-off at the wave deadline
//!
//! Each task moves `Pending -> Running -> Done`. A task waits for a slot while
//! `Pending`; once the wave deadline passes no further task is admitted and the
//! remaining `Pending` tasks are abandoned. `Running` tasks always finish.
//! Children discovered by a task are handed to the driver over a channel before
//! the task offloads its images, so discovery and processing overlap.

use crate::article::Article;
use crate::config::{CrawlerConfig, DedupKeyKind};
use crate::crawler::dedup::{DedupGate, GateDecision};
use crate::crawler::document::ParsedDocument;
use crate::crawler::extractor::{ArticleExtractor, ExtractedArticle};
use crate::crawler::fetcher::fetch_document;
use crate::media::MediaOffloader;
use crate::state::{TaskOutcome, TaskState};
use crate::storage::DedupKey;
use crate::url::{resolve_href, LinkFilter};
use crate::CrawlerError;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use url::Url;

/// A URL queued for fetching at a given depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Canonical URL to fetch
    pub url: Url,

    /// Recursion depth, 0 for the seed
    pub depth: u32,
}

/// Depth, concurrency, and deadline limits of a wave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Tasks at this depth extract but discover nothing
    pub max_depth: u32,

    /// Maximum number of `Running` tasks
    pub max_concurrent_tasks: usize,

    /// Wall-clock budget for admitting tasks
    pub wave_deadline: Duration,
}

impl SchedulerLimits {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_concurrent_tasks: config.max_concurrent_tasks.max(1) as usize,
            wave_deadline: Duration::from_secs(config.wave_deadline_secs),
        }
    }
}

/// Counters reported at the end of a wave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveStats {
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
    pub peak_running: usize,
}

/// Articles and counters produced by one wave
#[derive(Debug)]
pub struct WaveOutcome {
    pub articles: Vec<Article>,
    pub stats: WaveStats,
    pub elapsed: Duration,
}

/// What a finished task reports back to the driver
#[derive(Debug)]
struct TaskReport {
    task: CrawlTask,
    outcome: TaskOutcome,
    article: Option<Article>,
}

#[derive(Debug, Default)]
struct WaveCounters {
    scheduled: AtomicUsize,
    attempted: AtomicUsize,
    abandoned: AtomicUsize,
    task_failures: AtomicUsize,
    fetch_failures: AtomicUsize,
    query_failures: AtomicUsize,
    articles_extracted: AtomicUsize,
    skipped_existing: AtomicUsize,
    links_dropped: AtomicUsize,
    images_stored: AtomicUsize,
    offload_failures: AtomicUsize,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl WaveCounters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WaveStats {
        WaveStats {
            tasks_scheduled: self.scheduled.load(Ordering::Relaxed),
            tasks_attempted: self.attempted.load(Ordering::Relaxed),
            tasks_abandoned: self.abandoned.load(Ordering::Relaxed),
            task_failures: self.task_failures.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            query_failures: self.query_failures.load(Ordering::Relaxed),
            articles_extracted: self.articles_extracted.load(Ordering::Relaxed),
            skipped_existing: self.skipped_existing.load(Ordering::Relaxed),
            links_dropped: self.links_dropped.load(Ordering::Relaxed),
            images_stored: self.images_stored.load(Ordering::Relaxed),
            offload_failures: self.offload_failures.load(Ordering::Relaxed),
            peak_running: self.peak_running.load(Ordering::Relaxed),
        }
    }
}

/// A held worker slot
///
/// Dropping it releases the semaphore permit and lowers the running count,
/// including when the task panics.
struct RunningSlot {
    ctx: Arc<WaveContext>,
    _permit: OwnedSemaphorePermit,
}

impl RunningSlot {
    fn enter(ctx: Arc<WaveContext>, permit: OwnedSemaphorePermit) -> Self {
        let running = ctx.counters.running.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.counters.peak_running.fetch_max(running, Ordering::SeqCst);
        Self {
            ctx,
            _permit: permit,
        }
    }
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        self.ctx.counters.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Outcome of the synchronous pass over a fetched document
enum Inspection {
    DiscoveryOnly,
    AlreadyIngested,
    QueryFailed(String),
    Ingest(ExtractedArticle),
}

/// State shared by every task of one wave
struct WaveContext {
    client: Client,
    extractor: Arc<ArticleExtractor>,
    offloader: MediaOffloader,
    gate: DedupGate,
    filter: LinkFilter,
    source: String,
    limits: SchedulerLimits,
    slots: Arc<Semaphore>,
    seen: Mutex<HashSet<String>>,
    counters: WaveCounters,
    deadline: Instant,
}

impl WaveContext {
    /// Inserts `url` into the seen-set, returning false if it was already there
    fn mark_seen(&self, url: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(url.to_string())
    }

    fn drop_link(&self, url: &str, reason: &'static str) {
        WaveCounters::bump(&self.counters.links_dropped);
        tracing::debug!(url, reason, "Dropped link");
    }

    /// Waits for a worker slot, giving up at the wave deadline
    async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        if Instant::now() >= self.deadline {
            return None;
        }

        let permit = tokio::time::timeout_at(self.deadline, self.slots.clone().acquire_owned())
            .await
            .ok()?
            .ok()?;

        // A slot freed right at the deadline does not admit a new task
        if Instant::now() >= self.deadline {
            return None;
        }

        Some(permit)
    }

    async fn process(
        &self,
        task: &CrawlTask,
        children: &UnboundedSender<CrawlTask>,
    ) -> (TaskOutcome, Option<Article>) {
        let inspection = match fetch_document(&self.client, &task.url).await {
            Ok(doc) => self.inspect(doc, task, children),
            Err(e) => {
                WaveCounters::bump(&self.counters.fetch_failures);
                tracing::warn!(
                    url = %task.url,
                    depth = task.depth,
                    kind = e.kind(),
                    "Fetch failed: {}",
                    e
                );
                return (TaskOutcome::FetchFailed(e.to_string()), None);
            }
        };

        match inspection {
            Inspection::DiscoveryOnly => (TaskOutcome::Discovered, None),
            Inspection::AlreadyIngested => {
                WaveCounters::bump(&self.counters.skipped_existing);
                tracing::debug!(url = %task.url, "Article already ingested");
                (TaskOutcome::AlreadyIngested, None)
            }
            Inspection::QueryFailed(message) => {
                WaveCounters::bump(&self.counters.query_failures);
                tracing::warn!(url = %task.url, "Existence query failed: {}", message);
                (TaskOutcome::QueryFailed(message), None)
            }
            Inspection::Ingest(extracted) => {
                let (article, tally) = extracted.offload_images(&self.offloader).await;
                self.counters
                    .images_stored
                    .fetch_add(tally.stored, Ordering::Relaxed);
                self.counters
                    .offload_failures
                    .fetch_add(tally.failed, Ordering::Relaxed);
                WaveCounters::bump(&self.counters.articles_extracted);
                (TaskOutcome::Article, Some(article))
            }
        }
    }

    /// Discovers children and reads the article out of `doc`
    ///
    /// Runs without awaiting; `doc` is consumed here.
    fn inspect(
        &self,
        doc: ParsedDocument,
        task: &CrawlTask,
        children: &UnboundedSender<CrawlTask>,
    ) -> Inspection {
        if task.depth < self.limits.max_depth {
            self.discover(&doc, task, children);
        }

        // An index page used as the seed is crawled for links only
        if task.depth == 0 && !self.filter.is_crawlable(task.url.as_str()) {
            return Inspection::DiscoveryOnly;
        }

        let extracted = self.extractor.extract(doc, &self.source, task.url.as_str());
        let kind = self.gate.key_kind();
        // In link mode children were gated at discovery, only the seed is left
        let gated = match kind {
            DedupKeyKind::Link => task.depth == 0,
            DedupKeyKind::TitleTime => true,
        };

        if gated {
            match self.gate.check(&extracted.dedup_key(kind)) {
                GateDecision::Proceed => {}
                GateDecision::Skip => return Inspection::AlreadyIngested,
                GateDecision::Abort(message) => return Inspection::QueryFailed(message),
            }
        }

        Inspection::Ingest(extracted)
    }

    fn discover(&self, doc: &ParsedDocument, task: &CrawlTask, children: &UnboundedSender<CrawlTask>) {
        let depth = task.depth + 1;

        for href in doc.hrefs() {
            if !self.filter.is_crawlable(&href) {
                self.drop_link(&href, "not_article");
                continue;
            }

            let url = match resolve_href(&href, doc.url()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::trace!(href = %href, "Unresolvable href: {}", e);
                    self.drop_link(&href, "unresolvable");
                    continue;
                }
            };

            if !self.mark_seen(url.as_str()) {
                self.drop_link(url.as_str(), "seen");
                continue;
            }

            if Instant::now() >= self.deadline {
                self.drop_link(url.as_str(), "past_deadline");
                continue;
            }

            if self.gate.checks_links() {
                match self.gate.check(&DedupKey::Link(url.to_string())) {
                    GateDecision::Proceed => {}
                    GateDecision::Skip => {
                        WaveCounters::bump(&self.counters.skipped_existing);
                        self.drop_link(url.as_str(), "already_ingested");
                        continue;
                    }
                    GateDecision::Abort(message) => {
                        WaveCounters::bump(&self.counters.query_failures);
                        WaveCounters::bump(&self.counters.links_dropped);
                        tracing::warn!(url = %url, reason = "query_failed", "Dropped link: {}", message);
                        continue;
                    }
                }
            }

            let child = CrawlTask { url, depth };
            match children.send(child) {
                Ok(()) => WaveCounters::bump(&self.counters.scheduled),
                Err(rejected) => self.drop_link(rejected.0.url.as_str(), "wave_closed"),
            }
        }
    }
}

/// Moves a task to `next`, rejecting transitions the lifecycle does not allow
fn advance(state: &mut TaskState, next: TaskState) -> Result<(), CrawlerError> {
    if !state.can_transition_to(next) {
        return Err(CrawlerError::InvalidTransition {
            from: *state,
            to: next,
        });
    }
    *state = next;
    Ok(())
}

async fn execute(
    ctx: Arc<WaveContext>,
    task: CrawlTask,
    children: UnboundedSender<CrawlTask>,
) -> Result<TaskReport, CrawlerError> {
    let mut state = TaskState::Pending;

    let permit = match ctx.admit().await {
        Some(permit) => permit,
        None => {
            advance(&mut state, TaskState::Done)?;
            WaveCounters::bump(&ctx.counters.abandoned);
            tracing::debug!(url = %task.url, depth = task.depth, "Task abandoned at wave deadline");
            return Ok(TaskReport {
                task,
                outcome: TaskOutcome::Abandoned,
                article: None,
            });
        }
    };

    advance(&mut state, TaskState::Running)?;
    let slot = RunningSlot::enter(ctx.clone(), permit);
    WaveCounters::bump(&ctx.counters.attempted);
    tracing::trace!(url = %task.url, depth = task.depth, "Task running");

    let (outcome, article) = ctx.process(&task, &children).await;

    drop(slot);
    advance(&mut state, TaskState::Done)?;

    Ok(TaskReport {
        task,
        outcome,
        article,
    })
}

/// Runs crawl waves
///
/// The scheduler itself is reusable; every call to [`WaveScheduler::run`]
/// starts with a fresh seen-set, slot pool, and counters.
pub struct WaveScheduler {
    client: Client,
    extractor: Arc<ArticleExtractor>,
    offloader: MediaOffloader,
    gate: DedupGate,
    filter: LinkFilter,
    source: String,
    limits: SchedulerLimits,
}

impl WaveScheduler {
    pub fn new(
        client: Client,
        extractor: ArticleExtractor,
        offloader: MediaOffloader,
        gate: DedupGate,
        filter: LinkFilter,
        source: impl Into<String>,
        limits: SchedulerLimits,
    ) -> Self {
        Self {
            client,
            extractor: Arc::new(extractor),
            offloader,
            gate,
            filter,
            source: source.into(),
            limits,
        }
    }

    pub fn limits(&self) -> SchedulerLimits {
        self.limits
    }

    /// Crawls from `seed` until every task is done or abandoned
    ///
    /// Task failures (fetch errors, panics) are counted and never end the wave.
    pub async fn run(&self, seed: &Url) -> WaveOutcome {
        let started = Instant::now();
        let ctx = Arc::new(WaveContext {
            client: self.client.clone(),
            extractor: self.extractor.clone(),
            offloader: self.offloader.clone(),
            gate: self.gate.clone(),
            filter: self.filter.clone(),
            source: self.source.clone(),
            limits: self.limits,
            slots: Arc::new(Semaphore::new(self.limits.max_concurrent_tasks)),
            seen: Mutex::new(HashSet::new()),
            counters: WaveCounters::default(),
            deadline: started + self.limits.wave_deadline,
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        let mut articles = Vec::new();

        ctx.mark_seen(seed.as_str());
        WaveCounters::bump(&ctx.counters.scheduled);
        tasks.spawn(execute(
            ctx.clone(),
            CrawlTask {
                url: seed.clone(),
                depth: 0,
            },
            tx.clone(),
        ));

        loop {
            // Every child is sent before its parent finishes, so an empty set
            // with an empty channel means the wave is over
            if tasks.is_empty() {
                match rx.try_recv() {
                    Ok(task) => {
                        tasks.spawn(execute(ctx.clone(), task, tx.clone()));
                        continue;
                    }
                    Err(_) => break,
                }
            }

            tokio::select! {
                Some(task) = rx.recv() => {
                    tasks.spawn(execute(ctx.clone(), task, tx.clone()));
                }
                Some(joined) = tasks.join_next() => {
                    if let Some(article) = record(&ctx, joined) {
                        articles.push(article);
                    }
                }
            }
        }

        let stats = ctx.counters.snapshot();
        let elapsed = started.elapsed();
        tracing::debug!(
            scheduled = stats.tasks_scheduled,
            attempted = stats.tasks_attempted,
            abandoned = stats.tasks_abandoned,
            peak_running = stats.peak_running,
            "Wave drained in {:?}",
            elapsed
        );

        WaveOutcome {
            articles,
            stats,
            elapsed,
        }
    }
}

fn record(
    ctx: &WaveContext,
    joined: Result<Result<TaskReport, CrawlerError>, JoinError>,
) -> Option<Article> {
    match joined {
        Ok(Ok(report)) => {
            tracing::trace!(
                url = %report.task.url,
                depth = report.task.depth,
                outcome = ?report.outcome,
                "Task done"
            );
            report.article
        }
        Ok(Err(e)) => {
            WaveCounters::bump(&ctx.counters.task_failures);
            tracing::error!("Task lifecycle error: {}", e);
            None
        }
        Err(e) => {
            WaveCounters::bump(&ctx.counters.task_failures);
            if e.is_panic() {
                tracing::error!("Task panicked: {}", e);
            } else {
                tracing::error!("Task was cancelled: {}", e);
            }
            None
        }
    }
}
