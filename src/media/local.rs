//! Local filesystem image backend

use crate::media::traits::{ImageBackend, OffloadError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes images under a root directory
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination path for `filename`
    ///
    /// Only the final component of `filename` is used so a crafted name cannot
    /// escape the root.
    pub fn destination(&self, filename: &str) -> Result<PathBuf, OffloadError> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| OffloadError::InvalidSource(filename.to_string()))?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl ImageBackend for LocalBackend {
    async fn store(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<String, OffloadError> {
        let path = self.destination(filename)?;
        let write_failed = |e: std::io::Error| OffloadError::StorageWriteFailed {
            filename: filename.to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        // fs::write truncates, so re-storing a filename overwrites it
        tokio::fs::write(&path, &bytes).await.map_err(write_failed)?;

        let absolute = tokio::fs::canonicalize(&path).await.map_err(write_failed)?;
        tracing::debug!("Stored image at {}", absolute.display());

        Ok(absolute.to_string_lossy().into_owned())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
