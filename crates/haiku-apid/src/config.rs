use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use haiku_core::{DeployConfig, MAX_UPLOAD_TTL, UploadConfig};
use haiku_observe::LoggerConfig;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "HAIKU_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where signed upload URLs come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStoreKind {
    /// Local URLs, no real storage behind them.
    #[default]
    Memory,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// gRPC listen address.
    pub listen: SocketAddr,
    /// `/metrics` listen address; disabled when absent.
    pub metrics_listen: Option<SocketAddr>,
    pub logger: LoggerConfig,
    pub deploy: DeployConfig,
    pub upload: UploadConfig,
    pub object_store: ObjectStoreKind,
    /// Delay between stages of the in-memory control plane's simulated rollouts.
    pub rollout_step_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0, 0, 0, 0, 1], 50051)),
            metrics_listen: None,
            logger: LoggerConfig::default(),
            deploy: DeployConfig::default(),
            upload: UploadConfig {
                bucket: "haiku-uploads".to_string(),
                ..UploadConfig::default()
            },
            object_store: ObjectStoreKind::default(),
            rollout_step_ms: 1_000,
        }
    }
}

impl AppConfig {
    /// Load the file named by [`CONFIG_ENV`], or defaults when it is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Self::default().validated(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: AppConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        if self.deploy.watch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "deploy.watchTimeoutMs must be greater than zero".into(),
            ));
        }
        if self.upload.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("upload.bucket cannot be empty".into()));
        }
        self.upload.ttl_secs = self.upload.ttl_secs.min(MAX_UPLOAD_TTL.as_secs());
        Ok(self)
    }
}
