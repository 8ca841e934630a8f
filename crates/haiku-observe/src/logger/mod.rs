mod config;
mod error;
mod log;
mod object;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use object::{LOG_FILTER_ENV, LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Install the global tracing subscriber described by `cfg`.
///
/// The filter from [`LOG_FILTER_ENV`] wins over `cfg.level` when it is set and valid.
/// Returns [`LoggerError::AlreadyInitialized`] on a second call.
///
/// ```rust,no_run
/// use haiku_observe::{LoggerConfig, init_logger};
///
/// init_logger(&LoggerConfig::default()).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::logger_text(cfg),
        LoggerFormat::Json => log::logger_json(cfg),
        LoggerFormat::Journald => log::logger_journald(cfg),
    }
}
