//! Prometheus metrics backend for haiku deployments.
//!
//! [`PrometheusMetrics`] implements [`haiku_core::MetricsBackend`] and keeps
//! its metrics in a [`prometheus::Registry`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use haiku_core::{Deployer, DeployConfig, Provisioner, memory::MemoryControlPlane};
//! use haiku_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = Arc::new(PrometheusMetrics::new()?);
//!
//! let plane = Arc::new(MemoryControlPlane::new());
//! let provisioner = Provisioner::new(plane).with_metrics(metrics.clone());
//! let _deployer = Deployer::new(provisioner, DeployConfig::default()).with_metrics(metrics.clone());
//!
//! let text = metrics.render()?;
//! assert!(text.contains("haiku_deploys_started_total"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `haiku_deploys_started_total` - Counter
//! - `haiku_deploys_completed_total{result}` - Counter
//! - `haiku_deploy_duration_seconds{result}` - Histogram
//! - `haiku_upstream_errors_total{operation}` - Counter
//! - `haiku_already_exists_total{kind}` - Counter
//!
//! ## HTTP Server
//! This crate does NOT serve `/metrics`; `haiku-apid` mounts
//! [`PrometheusMetrics::render`] on its own listener.
mod backend;
pub use backend::PrometheusMetrics;
