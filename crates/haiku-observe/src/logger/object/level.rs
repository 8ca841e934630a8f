use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

/// Environment variable that overrides the configured filter at startup.
pub const LOG_FILTER_ENV: &str = "HAIKU_LOG";

/// Validated `EnvFilter` directive string.
///
/// Holds the raw expression (`"info"`, `"haiku_core=debug,tonic=info,warn"`)
/// so it can round-trip through config files unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// Parse and validate a filter expression.
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        let raw = s.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LoggerError::InvalidLevel("empty filter".into()));
        }
        EnvFilter::try_new(trimmed)
            .map_err(|e| LoggerError::InvalidLevel(format!("{trimmed}: {e}")))?;
        Ok(Self(trimmed.to_string()))
    }

    /// Use [`LOG_FILTER_ENV`] when it is set to a valid filter, `self` otherwise.
    pub fn or_env(self) -> Self {
        std::env::var(LOG_FILTER_ENV)
            .ok()
            .and_then(|v| Self::new(v).ok())
            .unwrap_or(self)
    }

    /// Append a per-target directive, e.g. `with_directive("tonic", "warn")`.
    pub fn with_directive(self, target: &str, level: &str) -> Result<Self, LoggerError> {
        Self::new(format!("{},{target}={level}", self.0))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the runtime filter.
    pub fn to_env_filter(&self) -> EnvFilter {
        // Validated in `new`; the fallback only guards against filter grammar drift.
        EnvFilter::try_new(&self.0).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}
