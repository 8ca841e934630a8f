use std::sync::Arc;

/// Terminal classification of one deployment, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployResult {
    /// Resource reported success.
    Success,
    /// Resource reported failure, or an upstream/internal error ended the call.
    Failure,
    /// Caller went away or its deadline passed.
    Canceled,
    /// Watch deadline elapsed.
    Timeout,
}

impl DeployResult {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            DeployResult::Success => "success",
            DeployResult::Failure => "failure",
            DeployResult::Canceled => "canceled",
            DeployResult::Timeout => "timeout",
        }
    }
}

/// Metrics sink for deployment orchestration.
///
/// Injected into [`crate::Deployer`] and [`crate::Provisioner`]; the default is
/// [`crate::NoOpMetrics`].
pub trait MetricsBackend: Send + Sync + 'static {
    /// A deployment passed validation and is about to create its service.
    fn record_deploy_started(&self);

    /// A deployment ended.
    ///
    /// # Arguments
    /// - `result`: how it ended
    /// - `duration_ms`: time from start to terminal state
    fn record_deploy_completed(&self, result: DeployResult, duration_ms: u64);

    /// A control-plane or object-store call failed.
    ///
    /// `operation` is a bounded label such as `"create"`, `"watch"` or `"sign_upload"`.
    fn record_upstream_error(&self, operation: &str);

    /// A create call found the resource already present.
    fn record_already_exists(&self, kind: &str);
}

/// Shared handle to a metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
