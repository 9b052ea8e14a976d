//! Media offloading
//!
//! This module relocates images found in article bodies:
//! - Downloads the image bytes with a single GET
//! - Maps the declared content type to a file extension
//! - Derives a filename from the last path segment of the source URL
//! - Hands the bytes to the configured [`ImageBackend`]

mod local;
mod remote;
mod traits;

pub use local::LocalBackend;
pub use remote::{default_public_base_url, RemoteBackend};
pub use traits::{ImageBackend, OffloadError, StoredImage};

use crate::config::StorageTarget;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Builds the backend selected by the storage configuration
pub fn build_backend(target: &StorageTarget) -> Result<Arc<dyn ImageBackend>, OffloadError> {
    match target {
        StorageTarget::Local { root } => Ok(Arc::new(LocalBackend::new(root))),
        StorageTarget::Remote(remote) => Ok(Arc::new(RemoteBackend::new(remote)?)),
    }
}

/// Downloads images and stores them through a backend
#[derive(Clone)]
pub struct MediaOffloader {
    client: Client,
    backend: Arc<dyn ImageBackend>,
}

impl MediaOffloader {
    pub fn new(client: Client, backend: Arc<dyn ImageBackend>) -> Self {
        Self { client, backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Fetches `image_url` and stores it through the backend
    ///
    /// A single attempt is made; any failure drops the image.
    pub async fn offload(&self, image_url: &str) -> Result<StoredImage, OffloadError> {
        let url =
            Url::parse(image_url).map_err(|_| OffloadError::InvalidSource(image_url.to_string()))?;
        let stem = last_segment(&url)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| OffloadError::DownloadFailed {
                url: image_url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OffloadError::DownloadFailed {
                url: image_url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type);

        let extension = match content_type.as_deref() {
            Some(ct) if !ct.starts_with("image/") => {
                return Err(OffloadError::UnsupportedContentType {
                    url: image_url.to_string(),
                    content_type: ct.to_string(),
                });
            }
            Some(ct) => extension_for(ct),
            None => "",
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OffloadError::DownloadFailed {
                url: image_url.to_string(),
                message: e.to_string(),
            })?;

        let filename = format!("{}{}", stem, extension);
        let location = self
            .backend
            .store(&filename, bytes.to_vec(), content_type.as_deref())
            .await?;

        tracing::debug!(
            image = image_url,
            backend = self.backend.name(),
            "Offloaded image to {}",
            location
        );

        Ok(StoredImage { location, filename })
    }
}

/// File extension for a declared image content type
///
/// Unknown types get no extension.
pub fn extension_for(content_type: &str) -> &'static str {
    match media_type(content_type).as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        _ => "",
    }
}

fn last_segment(url: &Url) -> Result<String, OffloadError> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| OffloadError::InvalidSource(url.to_string()))
}

/// Lowercased content type without parameters
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
