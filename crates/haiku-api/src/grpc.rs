use std::{pin::Pin, sync::Arc};

use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming};
use tracing::{Instrument, debug, info_span, warn};

use haiku_core::CallContext;
use haiku_model::{DeploySpec, RequestId};

use crate::{
    error::ApiError,
    handler::ApiHandler,
    proto::{self, cli_service_server::CliService},
    request_id::{call_context, stamp_response, stamp_status},
};

/// gRPC service implementation.
///
/// Wraps an [`ApiHandler`] and implements the generated `CliService` trait.
/// Every reply and every error status carries the call's `x-request-id`,
/// exactly once. `DeployStream` carries it in the response headers sent when
/// the stream opens; errors inside the stream are not stamped again.
pub struct CliApiService<H> {
    handler: Arc<H>,
}

impl<H> CliApiService<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }
}

/// Stamp the correlation id onto whichever way the call ended.
fn respond<T>(result: Result<T, ApiError>, id: &RequestId) -> Result<Response<T>, Status> {
    match result {
        Ok(reply) => Ok(stamp_response(Response::new(reply), id)),
        Err(e) => {
            debug!(request_id = %id, error = %e, "call failed");
            Err(stamp_status(Status::from(e), id))
        }
    }
}

fn rpc_span(method: &'static str, ctx: &CallContext) -> tracing::Span {
    info_span!("rpc", method, request_id = %ctx.request_id())
}

pub type DeployUpdateStream =
    Pin<Box<dyn Stream<Item = Result<proto::DeployUpdate, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl<H> CliService for CliApiService<H>
where
    H: ApiHandler,
{
    async fn init(
        &self,
        request: Request<proto::InitRequest>,
    ) -> Result<Response<proto::InitReply>, Status> {
        let ctx = call_context(&request);
        let req = request.into_inner();

        let result = self
            .handler
            .init(&ctx, &req.environment_name)
            .instrument(rpc_span("Init", &ctx))
            .await
            .map(|id| proto::InitReply { id: id.into_string() });

        respond(result, ctx.request_id())
    }

    async fn deploy(
        &self,
        request: Request<proto::DeployRequest>,
    ) -> Result<Response<proto::DeployReply>, Status> {
        let ctx = call_context(&request);
        let result = async {
            let spec = DeploySpec::try_from(request.into_inner())?;
            self.handler.deploy(&ctx, spec).await
        }
        .instrument(rpc_span("Deploy", &ctx))
        .await
        .map(proto::DeployReply::from);

        respond(result, ctx.request_id())
    }

    type DeployStreamStream = DeployUpdateStream;

    async fn deploy_stream(
        &self,
        request: Request<Streaming<proto::DeployRequest>>,
    ) -> Result<Response<Self::DeployStreamStream>, Status> {
        let ctx = call_context(&request);
        let id = ctx.request_id().clone();
        let span = rpc_span("DeployStream", &ctx);
        let mut inbound = request.into_inner();

        // Only the first packet matters; later ones are ignored.
        let first = match inbound.message().await {
            Ok(Some(first)) => first,
            Ok(None) => {
                return Err(stamp_status(
                    Status::invalid_argument("first message must carry the deploy request"),
                    &id,
                ));
            }
            Err(status) => return Err(stamp_status(status, &id)),
        };
        let spec = match DeploySpec::try_from(first) {
            Ok(spec) => spec,
            Err(e) => return respond(Err(e), &id),
        };

        let (tx, rx) = mpsc::channel(1);
        let handler = Arc::clone(&self.handler);
        let task_ctx = ctx.with_request_id(id.clone());
        tokio::spawn(
            async move { handler.deploy_stream(task_ctx, spec, tx).await }.instrument(span),
        );

        // Tearing down the response stream cancels the deployment.
        let teardown = ctx.cancellation_token().clone().drop_guard();
        let stream_id = id.clone();
        let outbound = ReceiverStream::new(rx).map(move |item| {
            let _ = &teardown;
            match item {
                Ok(event) => Ok(proto::DeployUpdate::from(event)),
                Err(e) => {
                    warn!(request_id = %stream_id, error = %e, "deploy stream ended with error");
                    Err(Status::from(e))
                }
            }
        });

        Ok(stamp_response(
            Response::new(Box::pin(outbound) as Self::DeployStreamStream),
            &id,
        ))
    }

    async fn get_upload_url(
        &self,
        request: Request<proto::GetUploadUrlRequest>,
    ) -> Result<Response<proto::GetUploadUrlReply>, Status> {
        let ctx = call_context(&request);
        let req = request.into_inner();

        let result = self
            .handler
            .upload_url(&ctx, &req.environment_name, &req.service_name)
            .instrument(rpc_span("GetUploadURL", &ctx))
            .await
            .map(proto::GetUploadUrlReply::from);

        respond(result, ctx.request_id())
    }

    async fn docker_login(
        &self,
        request: Request<proto::DockerLoginRequest>,
    ) -> Result<Response<proto::DockerLoginReply>, Status> {
        let ctx = call_context(&request);
        let req = request.into_inner();
        let environment = req.environment_name.clone();

        let result = self
            .handler
            .docker_login(&ctx, &environment, req.into())
            .instrument(rpc_span("DockerLogin", &ctx))
            .await
            .map(|id| proto::DockerLoginReply { id: id.into_string() });

        respond(result, ctx.request_id())
    }
}
