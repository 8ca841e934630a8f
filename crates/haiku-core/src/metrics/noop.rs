use crate::metrics::backend::{DeployResult, MetricsBackend};

/// Backend that drops every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_deploy_started(&self) {}

    #[inline(always)]
    fn record_deploy_completed(&self, _: DeployResult, _: u64) {}

    #[inline(always)]
    fn record_upstream_error(&self, _: &str) {}

    #[inline(always)]
    fn record_already_exists(&self, _: &str) {}
}
