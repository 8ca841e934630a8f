//! Pre-signed upload URLs for source archives.
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use haiku_model::{UploadKey, UploadUrl};

use crate::{
    error::CoreError,
    metrics::{MetricsHandle, noop_metrics},
    request::CallContext,
};

/// Longest validity window a signed upload URL may have.
pub const MAX_UPLOAD_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("object store misconfigured: {0}")]
    Config(String),
}

/// Signs write-only URLs for single objects.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn sign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    pub bucket: String,
    /// Scheme of the canonical key handed back to callers.
    pub scheme: String,
    pub ttl_secs: u64,
    pub content_type: String,
    /// Backend region; `None` uses the store's own default chain.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            scheme: "s3".to_string(),
            ttl_secs: MAX_UPLOAD_TTL.as_secs(),
            content_type: "application/x-tar".to_string(),
            region: None,
            endpoint: None,
        }
    }
}

impl UploadConfig {
    /// Validity window, never longer than [`MAX_UPLOAD_TTL`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs).min(MAX_UPLOAD_TTL)
    }
}

/// Hands out signed upload locations.
#[derive(Clone)]
pub struct UploadIssuer {
    store: Arc<dyn ObjectStore>,
    config: UploadConfig,
    metrics: MetricsHandle,
}

impl UploadIssuer {
    pub fn new(store: Arc<dyn ObjectStore>, config: UploadConfig) -> Self {
        Self {
            store,
            config,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Sign an upload URL for a new source archive of `environment/service`.
    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id()))]
    pub async fn issue(
        &self,
        ctx: &CallContext,
        environment: &str,
        service: &str,
    ) -> Result<UploadUrl, CoreError> {
        self.issue_at(ctx, environment, service, SystemTime::now())
            .await
    }

    async fn issue_at(
        &self,
        ctx: &CallContext,
        environment: &str,
        service: &str,
        now: SystemTime,
    ) -> Result<UploadUrl, CoreError> {
        let key = UploadKey::generate(environment, service, now)?;
        let bucket = self.config.bucket.as_str();
        if bucket.is_empty() {
            return Err(CoreError::upstream(
                "sign upload",
                ctx.request_id(),
                "no upload bucket configured",
            ));
        }

        let ttl = self.config.ttl();
        let url = self
            .store
            .sign_upload(bucket, &key.to_string(), &self.config.content_type, ttl)
            .await
            .map_err(|e| {
                error!(request_id = %ctx.request_id(), %key, error = %e, "failed to sign upload url");
                self.metrics.record_upstream_error("sign_upload");
                CoreError::upstream("sign upload", ctx.request_id(), e.to_string())
            })?;

        if url.is_empty() {
            self.metrics.record_upstream_error("sign_upload");
            return Err(CoreError::upstream(
                "sign upload",
                ctx.request_id(),
                "object store returned an empty url",
            ));
        }

        let canonical_key = key.canonical(&self.config.scheme, bucket);
        info!(request_id = %ctx.request_id(), %canonical_key, ttl_secs = ttl.as_secs(), "upload url issued");

        Ok(UploadUrl {
            url,
            canonical_key,
            expires_at: now + ttl,
        })
    }
}
