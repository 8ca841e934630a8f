use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use haiku_model::{ProgressUpdate, RequestId};

use crate::{deploy::DeployEvent, error::CoreError};

/// The receiving side of a progress sink went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("progress receiver closed")]
pub struct SinkClosed;

/// Destination for progress updates of one deployment.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Deliver one update; may wait for the receiver to make room.
    async fn send(&mut self, update: ProgressUpdate) -> Result<(), SinkClosed>;

    /// Resolves once the receiver is gone. Never resolves for sinks without one.
    async fn closed(&self);
}

/// Forwards updates into the outbound channel of a streaming call.
pub struct ChannelSink {
    tx: mpsc::Sender<Result<DeployEvent, CoreError>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Result<DeployEvent, CoreError>>) -> Self {
        Self { tx }
    }

    pub fn into_inner(self) -> mpsc::Sender<Result<DeployEvent, CoreError>> {
        self.tx
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn send(&mut self, update: ProgressUpdate) -> Result<(), SinkClosed> {
        self.tx
            .send(Ok(DeployEvent::Progress(update)))
            .await
            .map_err(|_| SinkClosed)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Writes updates to the log; used when nobody listens for progress.
pub struct LogSink {
    request_id: RequestId,
}

impl LogSink {
    pub fn new(request_id: RequestId) -> Self {
        Self { request_id }
    }
}

#[async_trait]
impl ProgressSink for LogSink {
    async fn send(&mut self, update: ProgressUpdate) -> Result<(), SinkClosed> {
        if !update.is_filler() {
            info!(request_id = %self.request_id, stage = update.stage(), "{}", update.message());
        }
        Ok(())
    }

    async fn closed(&self) {
        std::future::pending::<()>().await
    }
}
