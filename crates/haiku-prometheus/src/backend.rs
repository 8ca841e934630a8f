use std::sync::Arc;

use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use haiku_core::{DeployResult, MetricsBackend};

const NAMESPACE: &str = "haiku";

/// Prometheus metrics backend for haiku.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `result`: "success", "failure", "canceled", "timeout"
/// - `operation`: "create", "watch", "sign_upload"
/// - `kind`: "Namespace", "Service", "DockerLogin"
#[derive(Clone)]
pub struct PrometheusMetrics {
    deploys_started: Counter,
    deploys_completed: CounterVec,
    deploy_duration: HistogramVec,
    upstream_errors: CounterVec,
    already_exists: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend that registers into `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let deploys_started = Counter::with_opts(
            Opts::new("deploys_started_total", "Total number of deployments started")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(deploys_started.clone()))?;

        let deploys_completed = CounterVec::new(
            Opts::new(
                "deploys_completed_total",
                "Total number of deployments that reached a terminal state",
            )
            .namespace(NAMESPACE),
            &["result"],
        )?;
        registry.register(Box::new(deploys_completed.clone()))?;

        // Rollouts include image builds; buckets reach the default watch timeout.
        let deploy_duration = HistogramVec::new(
            HistogramOpts::new(
                "deploy_duration_seconds",
                "Time from deployment start to terminal state in seconds",
            )
            .namespace(NAMESPACE)
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
            &["result"],
        )?;
        registry.register(Box::new(deploy_duration.clone()))?;

        let upstream_errors = CounterVec::new(
            Opts::new(
                "upstream_errors_total",
                "Failed control-plane and object-store calls",
            )
            .namespace(NAMESPACE),
            &["operation"],
        )?;
        registry.register(Box::new(upstream_errors.clone()))?;

        let already_exists = CounterVec::new(
            Opts::new(
                "already_exists_total",
                "Create calls that found the resource already present",
            )
            .namespace(NAMESPACE),
            &["kind"],
        )?;
        registry.register(Box::new(already_exists.clone()))?;

        Ok(Self {
            deploys_started,
            deploys_completed,
            deploy_duration,
            upstream_errors,
            already_exists,
            registry,
        })
    }

    /// Create a backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// All metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`PrometheusMetrics::render`] output.
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_deploy_started(&self) {
        self.deploys_started.inc();
    }

    fn record_deploy_completed(&self, result: DeployResult, duration_ms: u64) {
        self.deploys_completed
            .with_label_values(&[result.as_label()])
            .inc();
        self.deploy_duration
            .with_label_values(&[result.as_label()])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_upstream_error(&self, operation: &str) {
        self.upstream_errors.with_label_values(&[operation]).inc();
    }

    fn record_already_exists(&self, kind: &str) {
        self.already_exists.with_label_values(&[kind]).inc();
    }
}
