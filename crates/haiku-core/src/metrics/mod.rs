//! Metrics abstraction for deployment orchestration.
//!
//! Backends (see the `haiku-prometheus` crate) implement [`MetricsBackend`].
mod backend;
pub use backend::{DeployResult, MetricsBackend, MetricsHandle};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

use crate::error::CoreError;

#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}

impl DeployResult {
    /// Classify a deployment error.
    pub fn from_error(err: &CoreError) -> Self {
        match err {
            CoreError::Timeout(_) => DeployResult::Timeout,
            CoreError::Canceled => DeployResult::Canceled,
            _ => DeployResult::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn errors_map_to_bounded_labels() {
        let cases = [
            (CoreError::Timeout(Duration::from_secs(1)), "timeout"),
            (CoreError::Canceled, "canceled"),
            (CoreError::DeploymentFailed("x".into()), "failure"),
            (CoreError::Internal("x".into()), "failure"),
        ];
        for (err, label) in cases {
            assert_eq!(DeployResult::from_error(&err).as_label(), label);
        }
    }

    #[test]
    fn noop_handle_accepts_everything() {
        let m = noop_metrics();
        m.record_deploy_started();
        m.record_deploy_completed(DeployResult::Success, 10);
        m.record_upstream_error("create");
        m.record_already_exists("Service");
    }
}
