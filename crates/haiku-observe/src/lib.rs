//! Logging setup for haiku services.
//!
//! Installs a global `tracing` subscriber configured through [`LoggerConfig`].
mod logger;
pub use logger::*;
