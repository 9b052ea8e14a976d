//! Configuration module for news-wave
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Secrets and per-deployment values may be supplied through the environment.
//!
//! # Example
//!
//! ```no_run
//! use news_wave::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DedupKeyKind, ExtractorConfig, OutputConfig, QueryFailurePolicy,
    RemoteStorageConfig, StorageTarget, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
