use std::time::UNIX_EPOCH;

use haiku_core::DeployEvent;
use haiku_model::{CredentialSpec, DeployOutcome, DeploySpec, ServiceSource, UploadUrl};

use crate::{error::ApiError, proto};

// ============================================================================
// Requests (Proto → Domain)
// ============================================================================

impl TryFrom<proto::DeployRequest> for DeploySpec {
    type Error = ApiError;

    fn try_from(req: proto::DeployRequest) -> Result<Self, Self::Error> {
        let source = match req.source {
            Some(proto::deploy_request::Source::Image(image)) => ServiceSource::Image(image),
            Some(proto::deploy_request::Source::SourceUrl(url)) => ServiceSource::SourceUrl(url),
            None => {
                return Err(ApiError::InvalidRequest(
                    "deploy request needs an image or a source_url".into(),
                ));
            }
        };
        Ok(DeploySpec::new(req.environment_name, req.service_name, source)?)
    }
}

impl From<proto::DockerLoginRequest> for CredentialSpec {
    fn from(req: proto::DockerLoginRequest) -> Self {
        CredentialSpec {
            server: req.server,
            username: req.username,
            password: req.password,
            email: req.email,
        }
    }
}

// ============================================================================
// Replies (Domain → Proto)
// ============================================================================

impl From<DeployOutcome> for proto::DeployReply {
    fn from(outcome: DeployOutcome) -> Self {
        proto::DeployReply {
            url: outcome.url,
            id: outcome.id,
        }
    }
}

impl From<DeployEvent> for proto::DeployUpdate {
    fn from(event: DeployEvent) -> Self {
        let update = match event {
            DeployEvent::Progress(p) => proto::deploy_update::Update::Progress(proto::Progress {
                stage: p.stage() as u32,
                message: p.message().to_string(),
            }),
            DeployEvent::Completed(outcome) => proto::deploy_update::Update::Reply(outcome.into()),
        };
        proto::DeployUpdate {
            update: Some(update),
        }
    }
}

impl From<UploadUrl> for proto::GetUploadUrlReply {
    fn from(upload: UploadUrl) -> Self {
        let expires_at_unix = upload
            .expires_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        proto::GetUploadUrlReply {
            url: upload.url,
            canonical_key: upload.canonical_key,
            expires_at_unix,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use haiku_core::CoreError;
    use haiku_model::{ProgressUpdate, STAGES};

    use super::*;

    fn request(source: Option<proto::deploy_request::Source>) -> proto::DeployRequest {
        proto::DeployRequest {
            environment_name: "acme".into(),
            service_name: "web".into(),
            source,
        }
    }

    #[test]
    fn deploy_request_requires_a_source() {
        let err = DeploySpec::try_from(request(None)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));

        let spec = DeploySpec::try_from(request(Some(proto::deploy_request::Source::SourceUrl(
            "s3://uploads/acme/web/1/x".into(),
        ))))
        .unwrap();
        assert_eq!(
            spec.source(),
            &ServiceSource::SourceUrl("s3://uploads/acme/web/1/x".into())
        );
    }

    #[test]
    fn empty_names_are_validation_errors() {
        let mut req = request(Some(proto::deploy_request::Source::Image("nginx".into())));
        req.service_name = String::new();
        let err = DeploySpec::try_from(req).unwrap_err();
        assert!(matches!(err, ApiError::Core(CoreError::Validation(_))));
    }

    #[test]
    fn progress_keeps_stage_and_message() {
        let update = proto::DeployUpdate::from(DeployEvent::Progress(ProgressUpdate::Advanced(
            &STAGES[1],
        )));
        assert_eq!(
            update.update,
            Some(proto::deploy_update::Update::Progress(proto::Progress {
                stage: 2,
                message: STAGES[1].message.to_string(),
            }))
        );
    }

    #[test]
    fn upload_expiry_is_unix_seconds() {
        let reply = proto::GetUploadUrlReply::from(UploadUrl {
            url: "https://signed".into(),
            canonical_key: "s3://b/k".into(),
            expires_at: UNIX_EPOCH + Duration::from_secs(1_700_000_900),
        });
        assert_eq!(reply.expires_at_unix, 1_700_000_900);
    }
}
