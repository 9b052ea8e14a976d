//! Crawler module for fetching, extracting, and scheduling article pages
//!
//! This module contains the crawl engine, including:
//! - HTTP fetching into parsed documents
//! - Article extraction with image placeholders
//! - The deduplication gate against the article store
//! - Bounded-concurrency wave scheduling
//! - Overall wave coordination

mod coordinator;
mod dedup;
mod document;
mod extractor;
mod fetcher;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator};
pub use dedup::{DedupGate, GateDecision};
pub use document::{ImageSlot, ParsedDocument};
pub use extractor::{placeholder, ArticleExtractor, ExtractedArticle, ImageCandidate, OffloadTally};
pub use fetcher::{build_http_client, fetch_document, fetch_page, FetchedPage};
pub use scheduler::{CrawlTask, SchedulerLimits, WaveOutcome, WaveScheduler, WaveStats};
