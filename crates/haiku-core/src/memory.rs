//! In-process collaborators.
//!
//! [`MemoryControlPlane`] and [`MemoryObjectStore`] back the test suites and
//! the demo mode of `haiku-apid`. They follow the same contracts as the real
//! collaborators: creates are idempotent, a new watch first receives the
//! resource's current state as an `ADDED` event, watches fan out events in
//! order and stop when their subscription is released.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use haiku_model::{
    ConditionStatus, Labels, ResourceId, ResourceKind, STAGES, SUCCEEDED_CONDITION, URL_RESULT,
};

use crate::{
    control::{ControlPlane, ControlPlaneError, CreateResource, Subscription, WatchFeed},
    upload::{ObjectStore, ObjectStoreError},
};

/// Buffered events per watch before the producer waits.
const WATCH_BUFFER: usize = 16;

type ObjectKey = (ResourceKind, String, String);

/// Resource as stored by [`MemoryControlPlane`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub uid: ResourceId,
    pub labels: Labels,
    pub spec: Value,
}

struct Watcher {
    key: ObjectKey,
    feed: WatchFeed,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<ObjectKey, StoredObject>,
    /// Latest state per resource, replayed to new watchers.
    current: HashMap<ObjectKey, Value>,
    watchers: Vec<Watcher>,
    fail_next_create: Option<ControlPlaneError>,
}

/// Control plane kept in memory.
#[derive(Default)]
pub struct MemoryControlPlane {
    inner: Arc<Mutex<Inner>>,
    rollout_step: Option<Duration>,
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every created service walks through all stages, one every `step`, then
    /// reports success with an `http://<service>.<env>.haiku.local` url.
    pub fn with_simulated_rollout(mut self, step: Duration) -> Self {
        self.rollout_step = Some(step);
        self
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        lock(&self.inner).objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> Option<StoredObject> {
        let key = (kind, namespace.unwrap_or_default().to_string(), name.to_string());
        lock(&self.inner).objects.get(&key).cloned()
    }

    /// Make the next create fail with `err`.
    pub fn fail_next_create(&self, err: ControlPlaneError) {
        lock(&self.inner).fail_next_create = Some(err);
    }

    /// Watches that have not been released yet.
    pub fn active_watches(&self) -> usize {
        let mut inner = lock(&self.inner);
        inner.watchers.retain(|w| !w.feed.is_stopped());
        inner.watchers.len()
    }

    /// Send a raw watch event to every live watcher of the resource.
    ///
    /// Returns how many watchers received it.
    pub async fn publish(&self, kind: ResourceKind, namespace: &str, name: &str, event: Value) -> usize {
        publish(&self.inner, kind, namespace, name, event).await
    }

    fn spawn_rollout(&self, namespace: String, name: String, step: Duration) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            for count in 1..=STAGES.len() {
                tokio::time::sleep(step).await;
                let ev = ServiceEvent::modified(&namespace, &name).task_runs(count).into_json();
                publish(&inner, ResourceKind::Service, &namespace, &name, ev).await;
            }
            tokio::time::sleep(step).await;
            let url = format!("http://{name}.{namespace}.haiku.local");
            let ev = ServiceEvent::modified(&namespace, &name)
                .task_runs(STAGES.len())
                .succeeded(&url)
                .into_json();
            publish(&inner, ResourceKind::Service, &namespace, &name, ev).await;
            debug!(%namespace, %name, "simulated rollout finished");
        });
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    // A panicking test must not poison every later call.
    inner.lock().unwrap_or_else(|p| p.into_inner())
}

async fn publish(
    inner: &Mutex<Inner>,
    kind: ResourceKind,
    namespace: &str,
    name: &str,
    event: Value,
) -> usize {
    let key = (kind, namespace.to_string(), name.to_string());
    let feeds: Vec<WatchFeed> = {
        let mut inner = lock(inner);
        if event["type"] == "DELETED" {
            inner.current.remove(&key);
        } else if event["object"].is_object() {
            inner.current.insert(key.clone(), event["object"].clone());
        }
        inner.watchers.retain(|w| !w.feed.is_stopped());
        inner
            .watchers
            .iter()
            .filter(|w| w.key == key)
            .map(|w| w.feed.clone())
            .collect()
    };

    let mut delivered = 0;
    for feed in feeds {
        if feed.send(event.clone()).await {
            delivered += 1;
        }
    }
    trace!(%kind, namespace, name, delivered, "published watch event");
    delivered
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn create(&self, request: CreateResource) -> Result<ResourceId, ControlPlaneError> {
        let namespace = request.namespace.unwrap_or_default();
        let key = (request.kind, namespace.clone(), request.name.clone());

        let uid = {
            let mut inner = lock(&self.inner);
            if let Some(err) = inner.fail_next_create.take() {
                return Err(err);
            }
            if inner.objects.contains_key(&key) {
                return Err(ControlPlaneError::AlreadyExists {
                    kind: request.kind,
                    name: request.name,
                });
            }
            let uid = ResourceId::new(Uuid::new_v4().to_string());
            inner.objects.insert(
                key,
                StoredObject {
                    uid: uid.clone(),
                    labels: request.labels,
                    spec: request.spec,
                },
            );
            uid
        };

        if let (ResourceKind::Service, Some(step)) = (request.kind, self.rollout_step) {
            self.spawn_rollout(namespace, request.name, step);
        }
        Ok(uid)
    }

    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Subscription, ControlPlaneError> {
        let key = (kind, namespace.to_string(), name.to_string());
        let (feed, sub) = Subscription::channel(WATCH_BUFFER);

        // Replay under the lock so no later publish can overtake it.
        let mut inner = lock(&self.inner);
        if let Some(object) = inner.current.get(&key) {
            feed.try_send(json!({ "type": "ADDED", "object": object }));
        }
        inner.watchers.push(Watcher { key, feed });
        Ok(sub)
    }
}

/// Builder for raw service watch events.
///
/// ```
/// use haiku_core::memory::ServiceEvent;
///
/// let ev = ServiceEvent::modified("acme", "web").task_runs(2).into_json();
/// assert_eq!(ev["type"], "MODIFIED");
/// ```
#[derive(Debug, Clone)]
pub struct ServiceEvent {
    event_type: &'static str,
    namespace: String,
    name: String,
    task_runs: usize,
    outcome: ConditionStatus,
    message: String,
    url: Option<String>,
}

impl ServiceEvent {
    pub fn modified(namespace: &str, name: &str) -> Self {
        Self {
            event_type: "MODIFIED",
            namespace: namespace.to_string(),
            name: name.to_string(),
            task_runs: 0,
            outcome: ConditionStatus::Unknown,
            message: String::new(),
            url: None,
        }
    }

    pub fn deleted(namespace: &str, name: &str) -> Self {
        Self {
            event_type: "DELETED",
            ..Self::modified(namespace, name)
        }
    }

    pub fn task_runs(mut self, count: usize) -> Self {
        self.task_runs = count;
        self
    }

    /// Top-level condition `True`, optionally with a url result (empty = none).
    pub fn succeeded(mut self, url: &str) -> Self {
        self.outcome = ConditionStatus::True;
        self.url = (!url.is_empty()).then(|| url.to_string());
        self
    }

    pub fn failed(mut self, message: &str) -> Self {
        self.outcome = ConditionStatus::False;
        self.message = message.to_string();
        self
    }

    pub fn into_json(self) -> Value {
        let status: &'static str = self.outcome.into();
        let results: Vec<Value> = self
            .url
            .into_iter()
            .map(|u| json!({ "name": URL_RESULT, "value": u }))
            .collect();
        json!({
            "type": self.event_type,
            "object": {
                "kind": ResourceKind::Service.as_str(),
                "metadata": { "name": self.name, "namespace": self.namespace },
                "status": {
                    "conditions": [{
                        "type": SUCCEEDED_CONDITION,
                        "status": status,
                        "message": self.message,
                    }],
                    "taskRuns": (0..self.task_runs).map(|i| json!({ "name": format!("step-{i}") })).collect::<Vec<_>>(),
                    "results": results,
                }
            }
        })
    }
}

/// Object store that signs nothing and hands out predictable local URLs.
#[derive(Debug, Default, Clone)]
pub struct MemoryObjectStore {
    fail_with: Option<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every signing request fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn sign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        if let Some(msg) = &self.fail_with {
            warn!(bucket, key, "memory object store configured to fail");
            return Err(ObjectStoreError::Signing(msg.clone()));
        }
        Ok(format!(
            "http://{bucket}.storage.haiku.local/{key}?x-method=PUT&x-content-type={content_type}&x-expires={}",
            ttl.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_only_matching_live_watchers() {
        let plane = MemoryControlPlane::new();
        let mut web = plane.watch(ResourceKind::Service, "acme", "web").await.unwrap();
        let _api = plane.watch(ResourceKind::Service, "acme", "api").await.unwrap();
        assert_eq!(plane.active_watches(), 2);

        let ev = ServiceEvent::modified("acme", "web").task_runs(1).into_json();
        assert_eq!(plane.publish(ResourceKind::Service, "acme", "web", ev.clone()).await, 1);
        assert_eq!(web.next().await, Some(ev));

        web.release();
        assert_eq!(plane.active_watches(), 1);
        let ev = ServiceEvent::modified("acme", "web").into_json();
        assert_eq!(plane.publish(ResourceKind::Service, "acme", "web", ev).await, 0);
    }

    #[tokio::test]
    async fn new_watch_starts_from_the_current_state() {
        let plane = MemoryControlPlane::new();
        let ev = ServiceEvent::modified("acme", "web")
            .task_runs(4)
            .succeeded("https://web.acme")
            .into_json();
        assert_eq!(plane.publish(ResourceKind::Service, "acme", "web", ev.clone()).await, 0);

        let mut sub = plane.watch(ResourceKind::Service, "acme", "web").await.unwrap();
        let replayed = sub.next().await.unwrap();
        assert_eq!(replayed["type"], "ADDED");
        assert_eq!(replayed["object"], ev["object"]);

        let mut other = plane.watch(ResourceKind::Service, "acme", "api").await.unwrap();
        other.release();
        assert_eq!(other.next().await, None);
    }

    #[tokio::test]
    async fn deleted_resource_is_not_replayed() {
        let plane = MemoryControlPlane::new();
        let ev = ServiceEvent::modified("acme", "web").task_runs(1).into_json();
        plane.publish(ResourceKind::Service, "acme", "web", ev).await;
        let ev = ServiceEvent::deleted("acme", "web").into_json();
        plane.publish(ResourceKind::Service, "acme", "web", ev).await;

        let mut sub = plane.watch(ResourceKind::Service, "acme", "web").await.unwrap();
        let next = ServiceEvent::modified("acme", "web").task_runs(2).into_json();
        plane.publish(ResourceKind::Service, "acme", "web", next.clone()).await;
        assert_eq!(sub.next().await, Some(next));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let plane = MemoryControlPlane::new();
        let req = CreateResource {
            kind: ResourceKind::Environment,
            namespace: None,
            name: "acme".into(),
            labels: Labels::managed(),
            spec: json!({}),
        };
        plane.create(req.clone()).await.unwrap();
        assert!(matches!(
            plane.create(req).await,
            Err(ControlPlaneError::AlreadyExists { .. })
        ));
        assert_eq!(plane.len(), 1);
    }

    #[test]
    fn service_event_shape() {
        let ev = ServiceEvent::modified("acme", "web")
            .task_runs(3)
            .succeeded("https://web.acme")
            .into_json();
        assert_eq!(ev["object"]["status"]["taskRuns"].as_array().unwrap().len(), 3);
        assert_eq!(ev["object"]["status"]["conditions"][0]["status"], "True");
        assert_eq!(ev["object"]["status"]["results"][0]["value"], "https://web.acme");
    }

    #[tokio::test]
    async fn object_store_can_fail() {
        let store = MemoryObjectStore::failing("no credentials");
        let err = store
            .sign_upload("b", "k", "application/x-tar", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::Signing(_)));
    }
}
