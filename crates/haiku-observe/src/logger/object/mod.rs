pub mod format;
pub use format::LoggerFormat;

pub mod level;
pub use level::{LOG_FILTER_ENV, LoggerLevel};

pub mod rfc3339;
pub use rfc3339::LoggerRfc3339;

pub mod timezone;
pub use timezone::LoggerTimeZone;
