use serde::{Deserialize, Serialize};

use crate::{
    ModelError, ModelResult, ResourceKind,
    watch::snapshot::ResourceSnapshot,
};

/// Kind of a watch notification, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEventKind {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

/// Status object carried by an `ERROR` watch event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchFailure {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

/// One decoded watch notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent {
    Added(ResourceSnapshot),
    Modified(ResourceSnapshot),
    Deleted(ResourceSnapshot),
    /// Resource-version checkpoint; carries no state.
    Bookmark(serde_json::Value),
    Error(WatchFailure),
}

impl WatchEvent {
    /// Decode a raw event and check that it describes `expected`.
    pub fn decode(raw: serde_json::Value, expected: ResourceKind) -> ModelResult<Self> {
        let event: WatchEvent = serde_json::from_value(raw)
            .map_err(|e| ModelError::MalformedEvent(e.to_string()))?;

        if let Some(snapshot) = event.snapshot() {
            if snapshot.kind != expected.as_str() {
                return Err(ModelError::MalformedEvent(format!(
                    "expected {} object, got {:?}",
                    expected.as_str(),
                    snapshot.kind
                )));
            }
        }
        Ok(event)
    }

    pub fn kind(&self) -> WatchEventKind {
        match self {
            WatchEvent::Added(_) => WatchEventKind::Added,
            WatchEvent::Modified(_) => WatchEventKind::Modified,
            WatchEvent::Deleted(_) => WatchEventKind::Deleted,
            WatchEvent::Bookmark(_) => WatchEventKind::Bookmark,
            WatchEvent::Error(_) => WatchEventKind::Error,
        }
    }

    pub fn snapshot(&self) -> Option<&ResourceSnapshot> {
        match self {
            WatchEvent::Added(s) | WatchEvent::Modified(s) | WatchEvent::Deleted(s) => Some(s),
            WatchEvent::Bookmark(_) | WatchEvent::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_modified_service() {
        let raw = json!({
            "type": "MODIFIED",
            "object": {
                "kind": "Service",
                "metadata": {"name": "web", "namespace": "acme", "uid": "u-1"},
                "status": {"taskRuns": [{}, {}]}
            }
        });
        let ev = WatchEvent::decode(raw, ResourceKind::Service).unwrap();
        assert_eq!(ev.kind(), WatchEventKind::Modified);
        assert_eq!(ev.snapshot().unwrap().task_run_count(), 2);
    }

    #[test]
    fn wrong_kind_fails_closed() {
        let raw = json!({
            "type": "ADDED",
            "object": {"kind": "Namespace", "metadata": {"name": "acme"}}
        });
        let err = WatchEvent::decode(raw, ResourceKind::Service).unwrap_err();
        assert!(matches!(err, ModelError::MalformedEvent(_)));
    }

    #[test]
    fn unknown_event_type_fails_closed() {
        let raw = json!({"type": "EXPLODED", "object": {}});
        assert!(WatchEvent::decode(raw, ResourceKind::Service).is_err());
    }

    #[test]
    fn error_event_keeps_message() {
        let raw = json!({"type": "ERROR", "object": {"code": 410, "message": "too old"}});
        match WatchEvent::decode(raw, ResourceKind::Service).unwrap() {
            WatchEvent::Error(f) => {
                assert_eq!(f.code, 410);
                assert_eq!(f.message, "too old");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
