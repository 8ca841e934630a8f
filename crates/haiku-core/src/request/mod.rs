//! Per-call correlation.
//!
//! Every inbound call gets a [`RequestId`](haiku_model::RequestId), either the
//! one the caller sent in [`REQUEST_ID_HEADER`] or a freshly generated one, and
//! carries it in an explicit [`CallContext`] through every layer.
mod context;
pub use context::CallContext;

mod id;
pub use id::{IdGenerator, UlidGenerator, resolve_request_id};

/// Metadata key used for inbound and outbound correlation ids.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
