//! Typed view of watch notifications coming from the control plane.
//!
//! Raw events arrive as JSON documents shaped like Kubernetes watch events.
//! [`WatchEvent::decode`] turns them into a tagged enum and rejects anything
//! that does not describe the expected resource kind.
mod event;
pub use event::{WatchEvent, WatchEventKind, WatchFailure};

mod snapshot;
pub use snapshot::{
    Condition, ConditionStatus, ObjectMeta, ResourceSnapshot, ResourceStatus, ResultEntry,
    SUCCEEDED_CONDITION, URL_RESULT,
};
