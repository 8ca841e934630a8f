//! Deployment orchestration: create the service, then follow its rollout.
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use haiku_model::{DeployOutcome, DeploySpec, ProgressUpdate};

use crate::{
    error::CoreError,
    metrics::{DeployResult, MetricsHandle, noop_metrics},
    progress::{self, ChannelSink, LogSink, ProgressSink},
    provision::Provisioner,
    request::CallContext,
};

/// Longest wait for a stalled receiver to take the terminal message when the
/// call itself has no deadline.
const TERMINAL_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// One message of a streaming deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    Progress(ProgressUpdate),
    /// Always the last message of a successful deployment.
    Completed(DeployOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployConfig {
    /// How long to follow a rollout before giving up; independent of the caller's deadline.
    pub watch_timeout_ms: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            watch_timeout_ms: 10 * 60 * 1000,
        }
    }
}

impl DeployConfig {
    pub fn watch_timeout(&self) -> Duration {
        Duration::from_millis(self.watch_timeout_ms)
    }
}

#[derive(Clone)]
pub struct Deployer {
    provisioner: Provisioner,
    config: DeployConfig,
    metrics: MetricsHandle,
}

impl Deployer {
    pub fn new(provisioner: Provisioner, config: DeployConfig) -> Self {
        Self {
            provisioner,
            config,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Deploy `spec`, forwarding progress to `sink`.
    ///
    /// An existing service is not an error: its rollout is followed and the
    /// outcome reports an empty id.
    #[instrument(
        level = "debug",
        skip(self, ctx, spec, sink),
        fields(request_id = %ctx.request_id(), env = %spec.environment(), service = %spec.service())
    )]
    pub async fn deploy<S>(
        &self,
        ctx: &CallContext,
        spec: &DeploySpec,
        sink: &mut S,
    ) -> Result<DeployOutcome, CoreError>
    where
        S: ProgressSink + ?Sized,
    {
        let started = Instant::now();
        self.metrics.record_deploy_started();

        let result = self.run(ctx, spec, sink).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                info!(request_id = %ctx.request_id(), url = %outcome.url, elapsed_ms, "deployment finished");
                self.metrics
                    .record_deploy_completed(DeployResult::Success, elapsed_ms);
            }
            Err(e) => {
                warn!(request_id = %ctx.request_id(), error = %e, elapsed_ms, "deployment ended without success");
                self.metrics
                    .record_deploy_completed(DeployResult::from_error(e), elapsed_ms);
            }
        }
        result
    }

    async fn run<S>(
        &self,
        ctx: &CallContext,
        spec: &DeploySpec,
        sink: &mut S,
    ) -> Result<DeployOutcome, CoreError>
    where
        S: ProgressSink + ?Sized,
    {
        let id = match self.provisioner.create_service(ctx, spec).await {
            Ok(id) => id.into_string(),
            Err(CoreError::AlreadyExists { .. }) => {
                info!(request_id = %ctx.request_id(), "service already exists, following its rollout");
                String::new()
            }
            Err(e) => return Err(e),
        };

        let sub = self.provisioner.watch_service(ctx, spec).await?;
        let url = progress::follow(ctx, sub, sink, self.config.watch_timeout()).await?;
        Ok(DeployOutcome { id, url })
    }

    /// Streaming deployment: every update goes into `tx`, followed by exactly
    /// one terminal message, either `Completed` or the error.
    ///
    /// A receiver that stops reading gets the terminal message only until the
    /// call is canceled or [`TERMINAL_SEND_TIMEOUT`] passes.
    pub async fn deploy_stream(
        &self,
        ctx: &CallContext,
        spec: &DeploySpec,
        tx: mpsc::Sender<Result<DeployEvent, CoreError>>,
    ) {
        let mut sink = ChannelSink::new(tx);
        let terminal = self
            .deploy(ctx, spec, &mut sink)
            .await
            .map(DeployEvent::Completed);

        let tx = sink.into_inner();
        tokio::select! {
            biased;
            sent = tx.send(terminal) => {
                if sent.is_err() {
                    debug!(request_id = %ctx.request_id(), "stream receiver gone before the terminal message");
                }
            }
            _ = ctx.cancelled() => {
                debug!(request_id = %ctx.request_id(), "call canceled before the terminal message was taken");
            }
            _ = tokio::time::sleep(TERMINAL_SEND_TIMEOUT) => {
                warn!(request_id = %ctx.request_id(), "stream receiver stalled, terminal message dropped");
            }
        }
    }

    /// Deployment without a progress receiver; updates are only logged.
    pub async fn deploy_unary(
        &self,
        ctx: &CallContext,
        spec: &DeploySpec,
    ) -> Result<DeployOutcome, CoreError> {
        let mut sink = LogSink::new(ctx.request_id().clone());
        self.deploy(ctx, spec, &mut sink).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use haiku_model::{ResourceKind, STAGES, ServiceSource};

    use super::*;
    use crate::{
        control::ControlPlaneError,
        memory::{MemoryControlPlane, ServiceEvent},
        metrics::MetricsBackend,
    };

    #[derive(Default)]
    struct Recorded {
        completed: Mutex<Vec<DeployResult>>,
    }

    impl MetricsBackend for Recorded {
        fn record_deploy_started(&self) {}
        fn record_deploy_completed(&self, result: DeployResult, _duration_ms: u64) {
            self.completed.lock().unwrap().push(result);
        }
        fn record_upstream_error(&self, _operation: &str) {}
        fn record_already_exists(&self, _kind: &str) {}
    }

    fn spec() -> DeploySpec {
        DeploySpec::new("acme", "web", ServiceSource::Image("nginx:1.27".into())).unwrap()
    }

    fn deployer(plane: Arc<MemoryControlPlane>, watch_timeout_ms: u64) -> Deployer {
        Deployer::new(Provisioner::new(plane), DeployConfig { watch_timeout_ms })
    }

    async fn collect(mut rx: mpsc::Receiver<Result<DeployEvent, CoreError>>) -> Vec<Result<DeployEvent, CoreError>> {
        let mut out = Vec::new();
        while let Some(msg) = rx.recv().await {
            out.push(msg);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_rollout_streams_all_stages_then_outcome() {
        let plane = Arc::new(MemoryControlPlane::new().with_simulated_rollout(Duration::from_secs(1)));
        let d = deployer(plane.clone(), 60_000);
        let (tx, rx) = mpsc::channel(1);

        let ctx = CallContext::new("req-1".into());
        let spec = spec();
        let (_, msgs) = tokio::join!(d.deploy_stream(&ctx, &spec, tx), collect(rx));

        let (last, progress) = msgs.split_last().unwrap();
        let stages: Vec<usize> = progress
            .iter()
            .map(|m| match m {
                Ok(DeployEvent::Progress(u)) => u.stage(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(stages, (1..=STAGES.len()).collect::<Vec<_>>());

        match last {
            Ok(DeployEvent::Completed(outcome)) => {
                assert!(!outcome.id.is_empty());
                assert_eq!(outcome.url, "http://web.acme.haiku.local");
            }
            other => panic!("expected outcome, got {other:?}"),
        }
        assert_eq!(plane.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_the_only_terminal() {
        let plane = Arc::new(MemoryControlPlane::new());
        let metrics = Arc::new(Recorded::default());
        let d = deployer(plane.clone(), 5_000).with_metrics(metrics.clone());
        let (tx, rx) = mpsc::channel(1);

        let ctx = CallContext::background();
        let spec = spec();
        let (_, msgs) = tokio::join!(d.deploy_stream(&ctx, &spec, tx), collect(rx));

        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], Err(CoreError::Timeout(_))));
        assert_eq!(plane.active_watches(), 0);

        let late = ServiceEvent::modified("acme", "web").succeeded("u").into_json();
        assert_eq!(plane.publish(ResourceKind::Service, "acme", "web", late).await, 0);
        assert_eq!(*metrics.completed.lock().unwrap(), [DeployResult::Timeout]);
    }

    #[tokio::test(start_paused = true)]
    async fn redeploy_of_finished_service_returns_its_url() {
        let plane = Arc::new(MemoryControlPlane::new().with_simulated_rollout(Duration::from_millis(10)));
        let d = deployer(plane.clone(), 5_000);
        let ctx = CallContext::background();

        let first = d.deploy_unary(&ctx, &spec()).await.unwrap();
        assert!(!first.id.is_empty());

        let started = tokio::time::Instant::now();
        let second = d.deploy_unary(&ctx, &spec()).await.unwrap();
        assert_eq!(second.id, "");
        assert_eq!(second.url, "http://web.acme.haiku.local");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(plane.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn redeploy_during_rollout_follows_it_to_the_end() {
        let plane = Arc::new(MemoryControlPlane::new());
        let d = deployer(plane.clone(), 60_000);
        let ctx = CallContext::background();

        // A rollout already in progress.
        d.provisioner.create_service(&ctx, &spec()).await.unwrap();
        let running = ServiceEvent::modified("acme", "web").task_runs(2).into_json();
        plane.publish(ResourceKind::Service, "acme", "web", running).await;

        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn({
            let d = d.clone();
            let ctx = ctx.clone();
            async move { d.deploy_stream(&ctx, &spec(), tx).await }
        });
        let collector = tokio::spawn(collect(rx));
        while plane.active_watches() == 0 {
            tokio::task::yield_now().await;
        }
        let done = ServiceEvent::modified("acme", "web")
            .task_runs(4)
            .succeeded("https://web.acme.example")
            .into_json();
        plane.publish(ResourceKind::Service, "acme", "web", done).await;

        task.await.unwrap();
        let msgs = collector.await.unwrap();
        let stages: Vec<usize> = msgs
            .iter()
            .filter_map(|m| match m {
                Ok(DeployEvent::Progress(u)) => Some(u.stage()),
                _ => None,
            })
            .collect();
        assert_eq!(stages, [2, 4]);
        match msgs.last() {
            Some(Ok(DeployEvent::Completed(outcome))) => {
                assert_eq!(outcome.id, "");
                assert_eq!(outcome.url, "https://web.acme.example");
            }
            other => panic!("expected outcome, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_receiver_is_given_up_on_cancellation() {
        let plane = Arc::new(MemoryControlPlane::new());
        plane.fail_next_create(ControlPlaneError::Api("quota exceeded".into()));
        let d = deployer(plane.clone(), 60_000);
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(Ok(DeployEvent::Progress(ProgressUpdate::StillWorking { stage: 0 }))).await.unwrap();

        let ctx = CallContext::background().with_timeout(Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        d.deploy_stream(&ctx, &spec(), tx).await;
        assert!(started.elapsed() < TERMINAL_SEND_TIMEOUT);

        assert!(matches!(rx.recv().await, Some(Ok(DeployEvent::Progress(_)))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_receiver_is_given_up_after_a_while() {
        let plane = Arc::new(MemoryControlPlane::new());
        plane.fail_next_create(ControlPlaneError::Api("quota exceeded".into()));
        let d = deployer(plane.clone(), 60_000);
        let (tx, _rx) = mpsc::channel(1);
        tx.send(Ok(DeployEvent::Progress(ProgressUpdate::StillWorking { stage: 0 }))).await.unwrap();

        let ctx = CallContext::background();
        let started = tokio::time::Instant::now();
        d.deploy_stream(&ctx, &spec(), tx).await;
        assert!(started.elapsed() >= TERMINAL_SEND_TIMEOUT);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn create_failure_is_sent_in_band() {
        let plane = Arc::new(MemoryControlPlane::new());
        plane.fail_next_create(ControlPlaneError::Api("quota exceeded".into()));
        let d = deployer(plane.clone(), 60_000);
        let (tx, rx) = mpsc::channel(1);

        let ctx = CallContext::new("req-3".into());
        let spec = spec();
        let (_, msgs) = tokio::join!(d.deploy_stream(&ctx, &spec, tx), collect(rx));

        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], Err(CoreError::Upstream { .. })));
        assert_eq!(plane.active_watches(), 0);
    }

    #[tokio::test]
    async fn caller_cancellation_stops_the_deployment() {
        let plane = Arc::new(MemoryControlPlane::new());
        let metrics = Arc::new(Recorded::default());
        let d = deployer(plane.clone(), 60_000).with_metrics(metrics.clone());
        let ctx = CallContext::background();

        let task = tokio::spawn({
            let ctx = ctx.clone();
            async move { d.deploy_unary(&ctx, &spec()).await }
        });
        while plane.active_watches() == 0 {
            tokio::task::yield_now().await;
        }
        ctx.cancel();

        assert!(matches!(task.await.unwrap(), Err(CoreError::Canceled)));
        assert_eq!(plane.active_watches(), 0);
        assert_eq!(*metrics.completed.lock().unwrap(), [DeployResult::Canceled]);
    }
}
