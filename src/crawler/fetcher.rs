//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for pages, including:
//! - Building the shared HTTP client with the crawler's user agent
//! - Single-attempt GET requests (no retry)
//! - Content-Type checks
//! - Error classification into [`FetchError`]

use crate::config::UserAgentConfig;
use crate::crawler::document::ParsedDocument;
use crate::FetchError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// A successfully fetched HTML page
#[derive(Debug)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value
    pub content_type: String,

    /// Page body content
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// The same client is used for pages, image downloads, and remote uploads.
///
/// # Example
///
/// ```no_run
/// use news_wave::config::UserAgentConfig;
/// use news_wave::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "news-wave".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL)
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL with a single GET
///
/// # Error Classification
///
/// | Condition | Error |
/// |-----------|-------|
/// | Timeout, connection refused, TLS, redirect loop | `Unreachable` |
/// | Non-2xx status | `BadStatus` |
/// | Non-HTML Content-Type | `Malformed` |
/// | Body cannot be read | `Malformed` |
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| FetchError::Unreachable {
            url: url.to_string(),
            message: classify_transport_error(&e),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();

    // Check Content-Type; a missing header is given the benefit of the doubt
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !is_html(&content_type) {
        return Err(FetchError::Malformed {
            url: url.to_string(),
            message: format!("unexpected content type {}", content_type),
        });
    }

    let body = response.text().await.map_err(|e| FetchError::Malformed {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Fetches a URL and parses the body into a document handle
pub async fn fetch_document(client: &Client, url: &Url) -> Result<ParsedDocument, FetchError> {
    let page = fetch_page(client, url).await?;
    tracing::trace!(
        url = %url,
        status = page.status_code,
        bytes = page.body.len(),
        "Fetched page"
    );
    Ok(ParsedDocument::parse(&page.body, page.final_url))
}

fn is_html(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "text/html" || media_type == "application/xhtml+xml"
}

fn classify_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    }
}
