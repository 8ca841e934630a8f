use thiserror::Error;
use tonic::{Code, Status};

use haiku_core::CoreError;
use haiku_model::ModelError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request shape is wrong before it reaches the domain layer.
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::Core(CoreError::from(e))
    }
}

impl ApiError {
    pub fn code(&self) -> Code {
        match self {
            ApiError::InvalidRequest(_) => Code::InvalidArgument,
            ApiError::Core(e) => match e {
                CoreError::AlreadyExists { .. } => Code::AlreadyExists,
                CoreError::Validation(_) => Code::InvalidArgument,
                CoreError::Upstream { .. } => Code::Unavailable,
                CoreError::Timeout(_) => Code::DeadlineExceeded,
                CoreError::Canceled => Code::Cancelled,
                CoreError::DeploymentFailed(_) => Code::Aborted,
                CoreError::Internal(_) => Code::Internal,
            },
        }
    }
}

impl From<ApiError> for Status {
    fn from(e: ApiError) -> Self {
        Status::new(e.code(), e.to_string())
    }
}

impl From<CoreError> for Status {
    fn from(e: CoreError) -> Self {
        Status::from(ApiError::Core(e))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use haiku_model::{RequestId, ResourceKind};

    use super::*;

    #[test]
    fn core_errors_map_to_grpc_codes() {
        let cases = [
            (
                CoreError::AlreadyExists {
                    kind: ResourceKind::Environment,
                    name: "acme".into(),
                },
                Code::AlreadyExists,
            ),
            (CoreError::Validation("x".into()), Code::InvalidArgument),
            (
                CoreError::upstream("create Namespace", &RequestId::from("r"), "boom"),
                Code::Unavailable,
            ),
            (CoreError::Timeout(Duration::from_secs(1)), Code::DeadlineExceeded),
            (CoreError::Canceled, Code::Cancelled),
            (CoreError::DeploymentFailed("x".into()), Code::Aborted),
            (CoreError::Internal("x".into()), Code::Internal),
        ];
        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn upstream_message_names_the_request() {
        let status = Status::from(CoreError::upstream(
            "create Service",
            &RequestId::from("req-42"),
            "connection refused",
        ));
        assert!(status.message().contains("req-42"));
        assert!(status.message().contains("connection refused"));
    }
}
