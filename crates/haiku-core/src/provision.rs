//! Idempotent creates against the control plane.
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, instrument};
use uuid::Uuid;

use haiku_model::{
    CredentialSpec, DeploySpec, LABEL_ENVIRONMENT, LABEL_SERVICE, Labels, ResourceId,
    ResourceKind, ServiceSource, sanitize_segment,
};

use crate::{
    control::{ControlPlane, ControlPlaneError, CreateResource, Subscription},
    error::CoreError,
    metrics::{MetricsHandle, noop_metrics},
    request::CallContext,
};

/// Issues create calls for tenant resources.
///
/// No retries happen here. "Already exists" is reported as
/// [`CoreError::AlreadyExists`]; every other failure becomes
/// [`CoreError::Upstream`] tagged with the caller's request id.
#[derive(Clone)]
pub struct Provisioner {
    plane: Arc<dyn ControlPlane>,
    metrics: MetricsHandle,
}

impl Provisioner {
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            plane,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Create the namespace backing a tenant environment.
    #[instrument(level = "debug", skip(self, ctx), fields(request_id = %ctx.request_id()))]
    pub async fn create_environment(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<ResourceId, CoreError> {
        let key = environment_key(name)?;
        let mut labels = Labels::managed();
        labels.insert(LABEL_ENVIRONMENT, name);

        self.create(
            ctx,
            CreateResource {
                kind: ResourceKind::Environment,
                namespace: None,
                name: key,
                labels,
                spec: json!({}),
            },
        )
        .await
    }

    /// Create the service resource that drives a rollout of `spec.source()`.
    #[instrument(
        level = "debug",
        skip(self, ctx, spec),
        fields(request_id = %ctx.request_id(), env = %spec.environment(), service = %spec.service())
    )]
    pub async fn create_service(
        &self,
        ctx: &CallContext,
        spec: &DeploySpec,
    ) -> Result<ResourceId, CoreError> {
        let mut labels = Labels::managed();
        labels
            .insert(LABEL_ENVIRONMENT, spec.environment())
            .insert(LABEL_SERVICE, spec.service());

        let body = match spec.source() {
            ServiceSource::Image(image) => json!({ "image": image }),
            ServiceSource::SourceUrl(url) => json!({ "sourceUrl": url }),
        };

        self.create(
            ctx,
            CreateResource {
                kind: ResourceKind::Service,
                namespace: Some(spec.environment_key()),
                name: spec.service_key(),
                labels,
                spec: body,
            },
        )
        .await
    }

    /// Store registry login material in `environment`.
    ///
    /// Each call creates a fresh credential named `docker-<uuid>-<server>`.
    #[instrument(
        level = "debug",
        skip(self, ctx, credential),
        fields(request_id = %ctx.request_id(), server = %credential.server)
    )]
    pub async fn create_upload_credential(
        &self,
        ctx: &CallContext,
        environment: &str,
        credential: &CredentialSpec,
    ) -> Result<ResourceId, CoreError> {
        let namespace = environment_key(environment)?;
        credential.validate()?;

        let name = format!(
            "docker-{}-{}",
            Uuid::new_v4(),
            sanitize_segment(&credential.server)
        );
        let mut labels = Labels::managed();
        labels.insert(LABEL_ENVIRONMENT, environment);

        let spec = serde_json::to_value(credential)
            .map_err(|e| CoreError::Internal(format!("encode credential: {e}")))?;

        self.create(
            ctx,
            CreateResource {
                kind: ResourceKind::RegistryCredential,
                namespace: Some(namespace),
                name,
                labels,
                spec,
            },
        )
        .await
    }

    /// Open a watch on the service created for `spec`.
    pub async fn watch_service(
        &self,
        ctx: &CallContext,
        spec: &DeploySpec,
    ) -> Result<Subscription, CoreError> {
        self.plane
            .watch(
                ResourceKind::Service,
                &spec.environment_key(),
                &spec.service_key(),
            )
            .await
            .map_err(|e| {
                self.metrics.record_upstream_error("watch");
                error!(request_id = %ctx.request_id(), error = %e, "failed to open service watch");
                CoreError::upstream("watch Service", ctx.request_id(), e.to_string())
            })
    }

    async fn create(
        &self,
        ctx: &CallContext,
        request: CreateResource,
    ) -> Result<ResourceId, CoreError> {
        let kind = request.kind;
        let name = request.name.clone();

        match self.plane.create(request).await {
            Ok(id) => {
                info!(request_id = %ctx.request_id(), %kind, %name, id = %id, "resource created");
                Ok(id)
            }
            Err(ControlPlaneError::AlreadyExists { kind, name }) => {
                info!(request_id = %ctx.request_id(), %kind, %name, "resource already exists");
                self.metrics.record_already_exists(kind.as_str());
                Err(CoreError::AlreadyExists { kind, name })
            }
            Err(ControlPlaneError::Api(message)) => {
                error!(request_id = %ctx.request_id(), %kind, %name, error = %message, "failed to create resource");
                self.metrics.record_upstream_error("create");
                Err(CoreError::upstream(create_op(kind), ctx.request_id(), message))
            }
        }
    }
}

fn environment_key(name: &str) -> Result<String, CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "environment name cannot be empty".into(),
        ));
    }
    let key = sanitize_segment(name);
    if key.is_empty() {
        return Err(CoreError::Validation(format!(
            "environment name {name:?} has no usable characters"
        )));
    }
    Ok(key)
}

fn create_op(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Environment => "create Namespace",
        ResourceKind::Service => "create Service",
        ResourceKind::RegistryCredential => "create DockerLogin",
    }
}
