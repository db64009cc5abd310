//! Configuration loading and validation.
//!
//! Configuration is merged from a YAML file and `COGPID_`-prefixed
//! environment variables. There is no programmatic defaults layer: serde
//! defaults cover optional fields, and the PID gains deliberately have none,
//! so a file that omits any of `pid.kp`, `pid.ki`, `pid.kd` or `pid.dt`
//! fails extraction instead of running with silently wrong dynamics.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Default config file path when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "cogpid.yaml";

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PID gain {0} is not finite")]
    NonFiniteGain(&'static str),

    #[error("Invalid limit pair {0}: min {1} must be below max {2}")]
    InvertedLimits(&'static str, f64, f64),

    #[error("Invalid oscillation_window: {0}. Must be at least 2")]
    InvalidOscillationWindow(usize),

    #[error("Invalid {0}: {1}. Must be within [0, 1]")]
    ThresholdOutOfRange(&'static str, f64),

    #[error("Quality tiers must be non-decreasing: {0} / {1} / {2}")]
    NonMonotoneTiers(f64, f64, f64),

    #[error("Quality phases must be ordered: initial_phase_end {0} >= mid_phase_end {1}")]
    InvalidPhases(u32, u32),

    #[error("Invalid {0}: must be at least 1")]
    ZeroFrequency(&'static str),

    #[error("Invalid max_iterations: must be at least 1")]
    ZeroIterations,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path`, with `COGPID_*` environment variables
    /// taking precedence over the file.
    pub fn load(path: &str) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("COGPID_").split("__"))
            .extract()
            .with_context(|| format!("failed to load configuration from {path}"))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a loaded configuration.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let pid = &config.pid;
        for (name, value) in [
            ("kp", pid.kp),
            ("ki", pid.ki),
            ("kd", pid.kd),
            ("dt", pid.dt),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteGain(name));
            }
        }

        if pid.integral_min >= pid.integral_max {
            return Err(ConfigError::InvertedLimits(
                "integral",
                pid.integral_min,
                pid.integral_max,
            ));
        }
        if pid.control_min >= pid.control_max {
            return Err(ConfigError::InvertedLimits(
                "control",
                pid.control_min,
                pid.control_max,
            ));
        }
        if pid.oscillation_window < 2 {
            return Err(ConfigError::InvalidOscillationWindow(pid.oscillation_window));
        }
        if !(0.0..=1.0).contains(&pid.setpoint) {
            return Err(ConfigError::ThresholdOutOfRange("pid.setpoint", pid.setpoint));
        }

        let safety = &config.safety;
        for (name, value) in [
            ("human_review_threshold", safety.human_review_threshold),
            ("rollback_threshold", safety.rollback_threshold),
            ("stagnation_threshold", safety.stagnation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange(name, value));
            }
        }
        if safety.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if safety.min_quality_score_initial > safety.min_quality_score_mid
            || safety.min_quality_score_mid > safety.min_quality_score_final
        {
            return Err(ConfigError::NonMonotoneTiers(
                safety.min_quality_score_initial,
                safety.min_quality_score_mid,
                safety.min_quality_score_final,
            ));
        }
        if safety.initial_phase_end >= safety.mid_phase_end {
            return Err(ConfigError::InvalidPhases(
                safety.initial_phase_end,
                safety.mid_phase_end,
            ));
        }

        let orchestration = &config.orchestration;
        if orchestration.checkpoint_frequency == 0 {
            return Err(ConfigError::ZeroFrequency("checkpoint_frequency"));
        }
        if orchestration.qa_frequency == 0 {
            return Err(ConfigError::ZeroFrequency("qa_frequency"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
