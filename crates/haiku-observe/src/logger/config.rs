use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::object::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger configuration, usually embedded in the service config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// Filter expression (`"info"`, `"haiku_core=debug,info"`).
    pub level: LoggerLevel,
    pub tz: LoggerTimeZone,
    /// Include module targets in each line.
    pub with_targets: bool,
    /// Color text output. Ignored when stdout is not a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }

    /// Configured level, overridden by `HAIKU_LOG` when present.
    pub fn effective_level(&self) -> LoggerLevel {
        self.level.clone().or_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg: LoggerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert_eq!(cfg.tz, LoggerTimeZone::Utc);
        assert_eq!(cfg.level.as_str(), "info");
        assert!(cfg.with_targets);
        assert!(cfg.use_color);
    }

    #[test]
    fn camel_case_fields() {
        let cfg: LoggerConfig = serde_json::from_str(
            r#"{"format":"json","level":"haiku_core=debug,info","withTargets":false,"tz":"local"}"#,
        )
        .unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level.as_str(), "haiku_core=debug,info");
        assert!(!cfg.with_targets);
        assert_eq!(cfg.tz, LoggerTimeZone::Local);
    }

    #[test]
    fn invalid_level_fails_the_whole_config() {
        let res = serde_json::from_str::<LoggerConfig>(r#"{"level":"haiku=shout"}"#);
        assert!(res.is_err());
    }
}
