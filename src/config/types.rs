use serde::Deserialize;

/// Main configuration structure for news-wave
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    pub storage: StorageTarget,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the wave starts from
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Source tag stamped on every article
    pub source: String,

    /// Maximum recursion depth (the seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of simultaneously running fetch+extract tasks
    #[serde(rename = "max-concurrent-tasks")]
    pub max_concurrent_tasks: u32,

    /// Wall-clock budget for admitting new tasks (seconds)
    #[serde(rename = "wave-deadline-secs")]
    pub wave_deadline_secs: u64,

    /// Which key is used to test prior ingestion
    #[serde(rename = "dedup-key", default)]
    pub dedup_key: DedupKeyKind,

    /// What to do when the existence query fails
    #[serde(rename = "query-failure-policy", default)]
    pub query_failure_policy: QueryFailurePolicy,

    /// Path segment that marks an article link
    #[serde(rename = "link-marker", default = "default_link_marker")]
    pub link_marker: String,
}

/// Shape of the deduplication key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupKeyKind {
    /// Canonical article link
    #[default]
    Link,
    /// (title, published time) pair
    TitleTime,
}

/// Policy applied when the dedup existence query fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryFailurePolicy {
    /// Drop the affected link/article
    #[default]
    Abort,
    /// Proceed as if the article were not ingested yet
    TreatAsNew,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// CSS selectors used by the article extractor
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    #[serde(rename = "headline-selector", default = "default_headline_selector")]
    pub headline_selector: String,

    #[serde(rename = "time-selector", default = "default_time_selector")]
    pub time_selector: String,

    #[serde(rename = "body-selector", default = "default_body_selector")]
    pub body_selector: String,

    #[serde(rename = "caption-selector", default = "default_caption_selector")]
    pub caption_selector: String,

    #[serde(rename = "noise-selector", default = "default_noise_selector")]
    pub noise_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            headline_selector: default_headline_selector(),
            time_selector: default_time_selector(),
            body_selector: default_body_selector(),
            caption_selector: default_caption_selector(),
            noise_selector: default_noise_selector(),
        }
    }
}

/// Where offloaded images go
///
/// Resolved once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum StorageTarget {
    /// Write images under a local directory
    Local {
        /// Root directory for downloaded images
        #[serde(default = "default_local_root")]
        root: String,
    },

    /// Upload images to an S3-compatible bucket
    Remote(RemoteStorageConfig),
}

/// Settings for the remote object storage backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteStorageConfig {
    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub region: String,

    /// Prefix prepended to every object key
    #[serde(rename = "key-prefix", default = "default_key_prefix")]
    pub key_prefix: String,

    /// Path-style endpoint for S3-compatible services; virtual-hosted AWS when absent
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Base of the returned public URL
    #[serde(rename = "public-base-url", default)]
    pub public_base_url: Option<String>,

    #[serde(rename = "access-key-id", default)]
    pub access_key_id: Option<String>,

    #[serde(rename = "secret-access-key", default)]
    pub secret_access_key: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown wave report
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_link_marker() -> String {
    "/news/".to_string()
}

fn default_headline_selector() -> String {
    "h1[data-test-locator='headline']".to_string()
}

fn default_time_selector() -> String {
    "time".to_string()
}

fn default_body_selector() -> String {
    "div.caas-body".to_string()
}

fn default_caption_selector() -> String {
    "figcaption".to_string()
}

fn default_noise_selector() -> String {
    "noscript".to_string()
}

fn default_local_root() -> String {
    "files/download".to_string()
}

fn default_key_prefix() -> String {
    "images/".to_string()
}
