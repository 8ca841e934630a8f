//! Boundary to the cluster resource control plane.
//!
//! The control plane is an external collaborator: this module only fixes the
//! shape of `create` and `watch`, plus the [`Subscription`] handle that owns a
//! live watch and guarantees it is released exactly once.
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use haiku_model::{Labels, ResourceId, ResourceKind};

#[derive(Debug, Clone, Error)]
pub enum ControlPlaneError {
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("{0}")]
    Api(String),
}

/// Create call for one resource.
#[derive(Debug, Clone)]
pub struct CreateResource {
    pub kind: ResourceKind,
    /// Owning environment; `None` for cluster-scoped kinds.
    pub namespace: Option<String>,
    pub name: String,
    pub labels: Labels,
    /// Kind-specific spec document.
    pub spec: serde_json::Value,
}

/// Resource control plane collaborator.
#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    /// Create a resource. Must report an existing one as [`ControlPlaneError::AlreadyExists`].
    async fn create(&self, request: CreateResource) -> Result<ResourceId, ControlPlaneError>;

    /// Subscribe to raw change events of the named resource.
    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Subscription, ControlPlaneError>;
}

/// Consumer side of a watch.
///
/// Events arrive as raw JSON documents in the order the control plane
/// produced them. [`Subscription::release`] stops the producer; it is
/// idempotent and also runs on drop.
pub struct Subscription {
    events: mpsc::Receiver<serde_json::Value>,
    stop: CancellationToken,
    released: bool,
}

/// Producer side of a watch, held by the control plane implementation.
#[derive(Clone)]
pub struct WatchFeed {
    events: mpsc::Sender<serde_json::Value>,
    stop: CancellationToken,
}

impl Subscription {
    /// Connected producer/consumer pair with room for `capacity` undelivered events.
    pub fn channel(capacity: usize) -> (WatchFeed, Subscription) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stop = CancellationToken::new();
        (
            WatchFeed {
                events: tx,
                stop: stop.clone(),
            },
            Subscription {
                events: rx,
                stop,
                released: false,
            },
        )
    }

    /// Next raw event; `None` once released or once the producer hung up.
    pub async fn next(&mut self) -> Option<serde_json::Value> {
        if self.released {
            return None;
        }
        self.events.recv().await
    }

    /// Stop the watch. Safe to call any number of times.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stop.cancel();
        self.events.close();
        trace!("watch subscription released");
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl WatchFeed {
    /// Deliver one event. Returns `false` once the consumer released the watch.
    pub async fn send(&self, event: serde_json::Value) -> bool {
        if self.stop.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }

    /// Deliver one event without waiting. Returns `false` when the buffer is
    /// full or the watch was released.
    pub fn try_send(&self, event: serde_json::Value) -> bool {
        !self.stop.is_cancelled() && self.events.try_send(event).is_ok()
    }

    /// `true` once the consumer released or dropped its subscription.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled() || self.events.is_closed()
    }

    /// Resolves once the consumer released or dropped its subscription.
    pub async fn stopped(&self) {
        tokio::select! {
            _ = self.stop.cancelled() => {}
            _ = self.events.closed() => {}
        }
    }
}
