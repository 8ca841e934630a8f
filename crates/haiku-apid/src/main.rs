use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info};

use haiku_api::{CliApiService, CliServiceServer, CoreApiAdapter, RequestIdInterceptor};
use haiku_core::{
    Deployer, MetricsHandle, ObjectStore, Provisioner, UploadIssuer,
    memory::{MemoryControlPlane, MemoryObjectStore},
};
use haiku_observe::init_logger;
use haiku_prometheus::PrometheusMetrics;
use haiku_s3::{S3ObjectStore, S3Options};

mod config;
mod metrics_http;

use config::{AppConfig, ObjectStoreKind};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) config + logger
    let cfg = AppConfig::load()?;
    init_logger(&cfg.logger)?;
    info!(listen = %cfg.listen, "logger initialized");

    // 2) metrics
    let prometheus = Arc::new(PrometheusMetrics::new()?);
    let metrics: MetricsHandle = prometheus.clone();

    // 3) collaborators
    let plane = Arc::new(
        MemoryControlPlane::new()
            .with_simulated_rollout(Duration::from_millis(cfg.rollout_step_ms)),
    );
    let store: Arc<dyn ObjectStore> = match cfg.object_store {
        ObjectStoreKind::Memory => Arc::new(MemoryObjectStore::new()),
        ObjectStoreKind::S3 => {
            Arc::new(S3ObjectStore::connect(&S3Options::from(&cfg.upload)).await)
        }
    };
    info!(object_store = ?cfg.object_store, bucket = %cfg.upload.bucket, "collaborators ready");

    // 4) core services
    let provisioner = Provisioner::new(plane).with_metrics(metrics.clone());
    let deployer =
        Deployer::new(provisioner.clone(), cfg.deploy.clone()).with_metrics(metrics.clone());
    let uploads = UploadIssuer::new(store, cfg.upload.clone()).with_metrics(metrics);

    // 5) gRPC service; in-flight calls end with the server
    let shutdown = CancellationToken::new();
    let handler = Arc::new(CoreApiAdapter::new(provisioner, deployer, uploads));
    let service = CliServiceServer::with_interceptor(
        CliApiService::new(handler),
        RequestIdInterceptor::default().with_shutdown(shutdown.clone()),
    );

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    if let Some(addr) = cfg.metrics_listen {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics_http::serve(addr, prometheus, shutdown).await {
                error!(error = %e, "metrics endpoint stopped");
            }
        });
    }

    // 6) serve
    info!(addr = %cfg.listen, "starting gRPC server");
    Server::builder()
        .add_service(service)
        .serve_with_shutdown(cfg.listen, shutdown.cancelled_owned())
        .await?;

    info!("gRPC server stopped");
    Ok(())
}
