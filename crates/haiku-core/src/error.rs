use std::time::Duration;

use thiserror::Error;

use haiku_model::{ModelError, RequestId, ResourceKind};

#[derive(Debug, Error)]
pub enum CoreError {
    /// Idempotent create found the resource in place; callers may treat it as success.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{op} failed upstream (request_id={request_id}): {message}")]
    Upstream {
        op: &'static str,
        request_id: RequestId,
        message: String,
    },

    #[error("deployment did not finish within {0:?}")]
    Timeout(Duration),

    #[error("call canceled")]
    Canceled,

    #[error("deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn upstream(op: &'static str, request_id: &RequestId, message: impl Into<String>) -> Self {
        CoreError::Upstream {
            op,
            request_id: request_id.clone(),
            message: message.into(),
        }
    }

    /// Bounded label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::AlreadyExists { .. } => "already_exists",
            CoreError::Validation(_) => "validation",
            CoreError::Upstream { .. } => "upstream",
            CoreError::Timeout(_) => "timeout",
            CoreError::Canceled => "canceled",
            CoreError::DeploymentFailed(_) => "deployment_failed",
            CoreError::Internal(_) => "internal",
        }
    }
}

impl From<ModelError> for CoreError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::MalformedEvent(msg) => CoreError::Internal(msg),
            other => CoreError::Validation(other.to_string()),
        }
    }
}
