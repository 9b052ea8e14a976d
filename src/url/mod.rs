//! URL handling module for news-wave
//!
//! This module provides the article link filter and href resolution into the
//! canonical links used for fetching and deduplication.

mod filter;
mod normalize;

pub use filter::{is_crawlable, LinkFilter, DEFAULT_LINK_MARKER};
pub use normalize::{normalize_url, resolve_href};
