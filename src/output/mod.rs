//! Output module for persisting wave results and generating reports
//!
//! This module handles:
//! - Flushing a wave's articles to the store in one bulk write
//! - The per-wave summary event
//! - Store statistics and the markdown wave report

mod markdown;
mod sink;
pub mod stats;
mod summary;

pub use markdown::{format_wave_report, write_wave_report};
pub use sink::ResultSink;
pub use stats::{load_statistics, print_statistics, StoreStatistics};
pub use summary::WaveSummary;

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] crate::storage::StoreError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
