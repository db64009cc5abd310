//! Infrastructure: configuration loading and logging bootstrap.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigLoader, DEFAULT_CONFIG_PATH};
pub use logging::JsonlIterationLog;
