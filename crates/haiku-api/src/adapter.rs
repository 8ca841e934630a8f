use async_trait::async_trait;
use tokio::sync::mpsc;

use haiku_core::{CallContext, CoreError, DeployEvent, Deployer, Provisioner, UploadIssuer};
use haiku_model::{CredentialSpec, DeployOutcome, DeploySpec, ResourceId, UploadUrl};

use crate::{error::ApiError, handler::ApiHandler};

/// Delegates every call to the haiku-core services.
#[derive(Clone)]
pub struct CoreApiAdapter {
    provisioner: Provisioner,
    deployer: Deployer,
    uploads: UploadIssuer,
}

impl CoreApiAdapter {
    pub fn new(provisioner: Provisioner, deployer: Deployer, uploads: UploadIssuer) -> Self {
        Self {
            provisioner,
            deployer,
            uploads,
        }
    }
}

#[async_trait]
impl ApiHandler for CoreApiAdapter {
    async fn init(&self, ctx: &CallContext, environment: &str) -> Result<ResourceId, ApiError> {
        Ok(self.provisioner.create_environment(ctx, environment).await?)
    }

    async fn deploy(&self, ctx: &CallContext, spec: DeploySpec) -> Result<DeployOutcome, ApiError> {
        Ok(self.deployer.deploy_unary(ctx, &spec).await?)
    }

    async fn deploy_stream(
        &self,
        ctx: CallContext,
        spec: DeploySpec,
        tx: mpsc::Sender<Result<DeployEvent, CoreError>>,
    ) {
        self.deployer.deploy_stream(&ctx, &spec, tx).await
    }

    async fn upload_url(
        &self,
        ctx: &CallContext,
        environment: &str,
        service: &str,
    ) -> Result<UploadUrl, ApiError> {
        Ok(self.uploads.issue(ctx, environment, service).await?)
    }

    async fn docker_login(
        &self,
        ctx: &CallContext,
        environment: &str,
        credential: CredentialSpec,
    ) -> Result<ResourceId, ApiError> {
        Ok(self
            .provisioner
            .create_upload_credential(ctx, environment, &credential)
            .await?)
    }
}
