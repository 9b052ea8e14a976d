//! S3-compatible object storage backend
//!
//! Objects are written with a single `PutObject` through the AWS SDK.
//! A put to an existing key replaces the object, so uploads are idempotent.

use crate::config::RemoteStorageConfig;
use crate::media::traits::{ImageBackend, OffloadError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

/// Uploads images to a bucket
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: S3Client,
    bucket: String,
    key_prefix: String,
    public_base_url: String,
}

impl RemoteBackend {
    /// Builds a backend from validated configuration
    ///
    /// A custom endpoint (MinIO and friends) is addressed path-style.
    pub fn new(config: &RemoteStorageConfig) -> Result<Self, OffloadError> {
        let missing = |field: &str| OffloadError::StorageWriteFailed {
            filename: String::new(),
            message: format!("missing {}", field),
        };

        let access_key_id = config
            .access_key_id
            .clone()
            .ok_or_else(|| missing("access key id"))?;
        let secret_access_key = config
            .secret_access_key
            .clone()
            .ok_or_else(|| missing("secret access key"))?;

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "news-wave",
            ))
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .endpoint_url(endpoint.trim_end_matches('/'))
                .force_path_style(true);
        }

        let public_base_url = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| default_public_base_url(&config.bucket, &config.region));

        Ok(Self {
            client: S3Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            key_prefix: config.key_prefix.clone(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Object key for `filename`
    pub fn object_key(&self, filename: &str) -> String {
        format!("{}{}", self.key_prefix, filename)
    }

    /// Public URL an uploaded object is served from
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl ImageBackend for RemoteBackend {
    async fn store(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String, OffloadError> {
        let key = self.object_key(filename);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| OffloadError::StorageWriteFailed {
                filename: filename.to_string(),
                message: format!("put {}/{}: {}", self.bucket, key, DisplayErrorContext(&e)),
            })?;

        Ok(self.public_url(&key))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/// `https://<bucket>.s3-<region>.amazonaws.com`
pub fn default_public_base_url(bucket: &str, region: &str) -> String {
    format!("https://{}.s3-{}.amazonaws.com", bucket, region)
}
