//! S3-backed [`ObjectStore`](haiku_core::ObjectStore).
//!
//! Upload URLs are pre-signed `PutObject` requests; nothing is sent to S3
//! while signing.
mod store;
pub use store::{S3ObjectStore, S3Options};
