use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::logger::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    object::LoggerRfc3339,
};

pub fn logger_text(cfg: &LoggerConfig) -> LoggerResult<()> {
    let fmt_layer = fmt::layer()
        .with_ansi(cfg.should_use_color())
        .with_target(cfg.with_targets)
        .with_timer(LoggerRfc3339::new(cfg.tz.resolve()));

    let subscriber = tracing_subscriber::registry()
        .with(cfg.effective_level().to_env_filter())
        .with(fmt_layer);
    init_subscriber(subscriber)
}

/// JSON lines; span fields such as `request_id` are flattened into each event.
pub fn logger_json(cfg: &LoggerConfig) -> LoggerResult<()> {
    let fmt_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_current_span(true)
        .with_span_list(false)
        .with_target(cfg.with_targets)
        .with_timer(LoggerRfc3339::new(cfg.tz.resolve()));

    let subscriber = tracing_subscriber::registry()
        .with(cfg.effective_level().to_env_filter())
        .with(fmt_layer);
    init_subscriber(subscriber)
}

#[cfg(target_os = "linux")]
pub fn logger_journald(cfg: &LoggerConfig) -> LoggerResult<()> {
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?
        .with_syslog_identifier("haiku-apid".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(cfg.effective_level().to_env_filter())
        .with(journald);
    init_subscriber(subscriber)
}

#[cfg(not(target_os = "linux"))]
pub fn logger_journald(_cfg: &LoggerConfig) -> LoggerResult<()> {
    Err(LoggerError::JournaldNotSupported)
}

fn init_subscriber<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
