use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::logger::error::LoggerError;

/// Timezone used for log timestamps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerTimeZone {
    #[default]
    Utc,
    /// System timezone, resolved once when the logger is installed.
    Local,
}

impl LoggerTimeZone {
    /// Resolve to a fixed offset.
    ///
    /// Local offset detection can fail once worker threads exist; UTC is used then.
    pub fn resolve(self) -> UtcOffset {
        match self {
            LoggerTimeZone::Utc => UtcOffset::UTC,
            LoggerTimeZone::Local => UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }
}

impl FromStr for LoggerTimeZone {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerTimeZone::Utc => "utc",
            LoggerTimeZone::Local => "local",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_resolves_to_zero_offset() {
        assert_eq!(LoggerTimeZone::Utc.resolve(), UtcOffset::UTC);
    }

    #[test]
    fn local_resolves_to_sane_offset() {
        assert!(LoggerTimeZone::Local.resolve().whole_hours().abs() <= 14);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("LOCAL".parse::<LoggerTimeZone>().unwrap(), LoggerTimeZone::Local);
        assert!("pst".parse::<LoggerTimeZone>().is_err());
        assert_eq!(LoggerTimeZone::Utc.to_string(), "utc");
    }
}
