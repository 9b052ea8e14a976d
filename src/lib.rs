//! news-wave: a bounded news crawler
//!
//! This crate crawls a news site from a seed URL, follows article links up to a
//! bounded depth, extracts article content and offloads embedded images to a
//! pluggable storage backend before persisting each wave in one bulk write.

pub mod article;
pub mod config;
pub mod crawler;
pub mod media;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for news-wave operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Offload error: {0}")]
    Offload(#[from] media::OffloadError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid task transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TaskState,
        to: state::TaskState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {field}: {selector}")]
    InvalidSelector { field: &'static str, selector: String },

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),
}

/// Errors raised while fetching a page
///
/// Every variant is local to one task: the scheduler reports it and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} is unreachable: {message}")]
    Unreachable { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    BadStatus { url: String, status: u16 },

    #[error("{url} could not be parsed: {message}")]
    Malformed { url: String, message: String },
}

impl FetchError {
    /// Short label used in log events and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::BadStatus { .. } => "bad_status",
            Self::Malformed { .. } => "malformed",
        }
    }
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty href")]
    Empty,

    #[error("Fragment-only href: {0}")]
    FragmentOnly(String),
}

/// Result type alias for news-wave operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use article::{Article, Image};
pub use config::{Config, StorageTarget};
pub use crawler::{Coordinator, WaveScheduler};
pub use output::WaveSummary;
pub use state::{TaskOutcome, TaskState};
pub use url::{is_crawlable, LinkFilter};
