use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client, error::DisplayErrorContext, presigning::PresigningConfig};
use tracing::debug;

use haiku_core::{ObjectStore, ObjectStoreError, UploadConfig};

/// Connection settings for [`S3ObjectStore`].
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    /// AWS region; falls back to the environment configuration.
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible stores.
    pub endpoint: Option<String>,
    /// Address buckets as path segments instead of subdomains.
    pub force_path_style: bool,
}

impl From<&UploadConfig> for S3Options {
    fn from(cfg: &UploadConfig) -> Self {
        Self {
            region: cfg.region.clone(),
            endpoint: cfg.endpoint.clone(),
            // S3-compatible stores rarely serve virtual-host buckets.
            force_path_style: cfg.endpoint.is_some(),
        }
    }
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client from the default AWS configuration chain.
    pub async fn connect(opts: &S3Options) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &opts.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &opts.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(opts.force_path_style)
            .build();
        Self::from_client(Client::from_conf(s3_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn sign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        let presigning =
            PresigningConfig::expires_in(ttl).map_err(|e| ObjectStoreError::Config(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| ObjectStoreError::Signing(DisplayErrorContext(&e).to_string()))?;

        debug!(bucket, key, ttl_secs = ttl.as_secs(), "presigned PutObject");
        Ok(request.uri().to_string())
    }
}
