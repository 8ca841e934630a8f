//! Turns service watch events into caller-facing progress.
mod sink;
mod tracker;

pub use sink::{ChannelSink, LogSink, ProgressSink, SinkClosed};
pub use tracker::{Observation, ProgressTracker};

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument, warn};

use haiku_model::{ProgressUpdate, ResourceKind, WatchEvent};

use crate::{control::Subscription, error::CoreError, request::CallContext};

/// Follow `sub` until the service reports an outcome, forwarding progress to `sink`.
///
/// Returns the service url on success. Caller cancellation and a closed sink
/// end the watch with [`CoreError::Canceled`]; `timeout` elapsing ends it with
/// [`CoreError::Timeout`]. The subscription is released on every path before
/// this returns.
#[instrument(level = "debug", skip_all, fields(request_id = %ctx.request_id()))]
pub async fn follow<S>(
    ctx: &CallContext,
    mut sub: Subscription,
    sink: &mut S,
    timeout: Duration,
) -> Result<String, CoreError>
where
    S: ProgressSink + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut tracker = ProgressTracker::new();

    let result = loop {
        let raw = tokio::select! {
            biased;
            _ = ctx.cancelled() => break Err(CoreError::Canceled),
            _ = sink.closed() => break Err(CoreError::Canceled),
            _ = sleep_until(deadline) => break Err(CoreError::Timeout(timeout)),
            raw = sub.next() => raw,
        };

        let Some(raw) = raw else {
            break Err(CoreError::upstream(
                "watch Service",
                ctx.request_id(),
                "watch closed before the service reported an outcome",
            ));
        };

        let event = match WatchEvent::decode(raw, ResourceKind::Service) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "undecodable watch event");
                break Err(e.into());
            }
        };

        match tracker.observe(event, ctx.request_id()) {
            Ok(Observation::Ignored) => {}
            Ok(Observation::Progress(update)) => {
                if let Err(e) = emit(ctx, sink, update, deadline, timeout).await {
                    break Err(e);
                }
            }
            Ok(Observation::Finished { progress, url }) => {
                if let Some(update) = progress {
                    if let Err(e) = emit(ctx, sink, update, deadline, timeout).await {
                        break Err(e);
                    }
                }
                break Ok(url);
            }
            Err(e) => break Err(e),
        }
    };

    sub.release();
    match &result {
        Ok(url) => debug!(%url, stage = tracker.last_stage(), "watch finished"),
        Err(e) => debug!(error = %e, stage = tracker.last_stage(), "watch ended"),
    }
    result
}

/// Hand one update to the sink, giving up at cancellation or the watch deadline.
async fn emit<S>(
    ctx: &CallContext,
    sink: &mut S,
    update: ProgressUpdate,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), CoreError>
where
    S: ProgressSink + ?Sized,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(CoreError::Canceled),
        _ = sleep_until(deadline) => Err(CoreError::Timeout(timeout)),
        sent = sink.send(update) => sent.map_err(|_| CoreError::Canceled),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use haiku_model::{FILLER_MESSAGE, STAGES};
    use tokio::sync::mpsc;

    use super::*;
    use crate::{control::ControlPlane, deploy::DeployEvent, memory::{MemoryControlPlane, ServiceEvent}};

    const TIMEOUT: Duration = Duration::from_secs(600);

    async fn watch(plane: &MemoryControlPlane) -> Subscription {
        plane.watch(ResourceKind::Service, "acme", "web").await.unwrap()
    }

    async fn publish(plane: &MemoryControlPlane, ev: ServiceEvent) {
        plane
            .publish(ResourceKind::Service, "acme", "web", ev.into_json())
            .await;
    }

    fn running(n: usize) -> ServiceEvent {
        ServiceEvent::modified("acme", "web").task_runs(n)
    }

    #[tokio::test]
    async fn forwards_progress_then_returns_url() {
        let plane = Arc::new(MemoryControlPlane::new());
        let sub = watch(&plane).await;
        let (tx, mut rx) = mpsc::channel(1);
        let ctx = CallContext::new("req-1".into());

        let follower = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                let mut sink = ChannelSink::new(tx);
                follow(&ctx, sub, &mut sink, TIMEOUT).await
            }
        });

        let producer = tokio::spawn({
            let plane = plane.clone();
            async move {
                for n in [1, 1, 2, 2, 3, 4] {
                    publish(&plane, running(n)).await;
                }
                publish(&plane, running(4).succeeded("https://web.acme.example")).await;
            }
        });

        let mut messages = Vec::new();
        while let Some(Ok(DeployEvent::Progress(u))) = rx.recv().await {
            messages.push(u.message());
        }
        producer.await.unwrap();

        assert_eq!(
            messages,
            [
                STAGES[0].message,
                FILLER_MESSAGE,
                STAGES[1].message,
                FILLER_MESSAGE,
                STAGES[2].message,
                STAGES[3].message,
            ]
        );
        assert_eq!(follower.await.unwrap().unwrap(), "https://web.acme.example");
        assert_eq!(plane.active_watches(), 0);
    }

    #[tokio::test]
    async fn cancellation_releases_the_watch() {
        let plane = MemoryControlPlane::new();
        let sub = watch(&plane).await;
        let ctx = CallContext::new("req-1".into());
        let mut sink = LogSink::new(ctx.request_id().clone());

        ctx.cancel();
        let err = follow(&ctx, sub, &mut sink, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, CoreError::Canceled));
        assert_eq!(plane.active_watches(), 0);
    }

    #[tokio::test]
    async fn closed_sink_counts_as_cancellation() {
        let plane = MemoryControlPlane::new();
        let sub = watch(&plane).await;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let mut sink = ChannelSink::new(tx);
        let err = follow(&CallContext::background(), sub, &mut sink, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Canceled));
        assert_eq!(plane.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_watch_times_out() {
        let plane = MemoryControlPlane::new();
        let sub = watch(&plane).await;
        let mut sink = LogSink::new("req-1".into());

        let err = follow(&CallContext::background(), sub, &mut sink, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout(d) if d == Duration::from_secs(5)));
        assert_eq!(plane.active_watches(), 0);

        // Events published after the timeout reach nobody.
        assert_eq!(
            plane
                .publish(ResourceKind::Service, "acme", "web", running(4).succeeded("u").into_json())
                .await,
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_receiver_cannot_outlive_the_deadline() {
        let plane = Arc::new(MemoryControlPlane::new());
        let sub = watch(&plane).await;
        // Room for one update, never drained.
        let (tx, _rx) = mpsc::channel(1);

        let producer = tokio::spawn({
            let plane = plane.clone();
            async move {
                publish(&plane, running(1)).await;
                publish(&plane, running(2)).await;
            }
        });

        let mut sink = ChannelSink::new(tx);
        let err = follow(&CallContext::background(), sub, &mut sink, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout(_)));
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_event_fails_closed() {
        let plane = MemoryControlPlane::new();
        let sub = watch(&plane).await;
        plane
            .publish(
                ResourceKind::Service,
                "acme",
                "web",
                serde_json::json!({ "type": "MODIFIED", "object": { "kind": "DockerLogin", "metadata": { "name": "web" } } }),
            )
            .await;

        let mut sink = LogSink::new("req-1".into());
        let err = follow(&CallContext::background(), sub, &mut sink, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
        assert_eq!(plane.active_watches(), 0);
    }

    #[tokio::test]
    async fn failure_condition_ends_the_watch() {
        let plane = MemoryControlPlane::new();
        let sub = watch(&plane).await;
        publish(&plane, running(2)).await;
        publish(&plane, running(2).failed("image pull backoff")).await;

        let mut sink = LogSink::new("req-1".into());
        let err = follow(&CallContext::background(), sub, &mut sink, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DeploymentFailed(m) if m == "image pull backoff"));
    }
}
