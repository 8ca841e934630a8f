use async_trait::async_trait;
use tokio::sync::mpsc;

use haiku_core::{CallContext, CoreError, DeployEvent};
use haiku_model::{CredentialSpec, DeployOutcome, DeploySpec, ResourceId, UploadUrl};

use crate::error::ApiError;

/// Backend behind the gRPC service.
///
/// [`crate::CoreApiAdapter`] is the stock implementation; wrap or replace it
/// to add auth or rate limiting in front of the core operations.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Create a tenant environment.
    async fn init(&self, ctx: &CallContext, environment: &str) -> Result<ResourceId, ApiError>;

    /// Deploy and wait for the outcome.
    async fn deploy(&self, ctx: &CallContext, spec: DeploySpec) -> Result<DeployOutcome, ApiError>;

    /// Deploy, writing progress and exactly one terminal message into `tx`.
    async fn deploy_stream(
        &self,
        ctx: CallContext,
        spec: DeploySpec,
        tx: mpsc::Sender<Result<DeployEvent, CoreError>>,
    );

    /// Signed upload location for a source archive.
    async fn upload_url(
        &self,
        ctx: &CallContext,
        environment: &str,
        service: &str,
    ) -> Result<UploadUrl, ApiError>;

    /// Store registry credentials in an environment.
    async fn docker_login(
        &self,
        ctx: &CallContext,
        environment: &str,
        credential: CredentialSpec,
    ) -> Result<ResourceId, ApiError>;
}
