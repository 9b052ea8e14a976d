//! Image backend trait and offload errors

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while offloading one image
///
/// An offload error drops that single image from its article; it never fails
/// the task or the wave.
#[derive(Debug, Error)]
pub enum OffloadError {
    #[error("Failed to download {url}: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Failed to store {filename}: {message}")]
    StorageWriteFailed { filename: String, message: String },

    #[error("Unsupported content type {content_type} for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Invalid image source {0}")]
    InvalidSource(String),
}

impl OffloadError {
    /// Short label used in log events and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DownloadFailed { .. } => "download_failed",
            Self::StorageWriteFailed { .. } => "storage_write_failed",
            Self::UnsupportedContentType { .. } => "unsupported_content_type",
            Self::InvalidSource(_) => "invalid_source",
        }
    }
}

/// Where an image ended up after a successful offload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Absolute path (local) or public URL (remote)
    pub location: String,

    /// Filename the backend stored the bytes under
    pub filename: String,
}

/// Trait for image storage backends
///
/// Storing the same filename twice must overwrite the earlier object rather
/// than fail, since one image can be referenced by several waves.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Stores `bytes` under `filename` and returns the location descriptor
    async fn store(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String, OffloadError>;

    /// Short backend name for log events
    fn name(&self) -> &'static str;
}
