//! Validated configuration structures.
//!
//! The configuration is strongly typed and resolved once at startup. Most
//! fields carry serde defaults; the PID gains and time step deliberately do
//! not. A config file missing `pid.kp`, `pid.ki`, `pid.kd` or `pid.dt` fails
//! extraction at load time -- wrong gains silently change closed-loop
//! behavior, so they must always be stated explicitly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Main configuration structure for cogpid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// PID controller parameters. Required section: gains have no defaults.
    pub pid: PidConfig,

    /// Safety guard thresholds and quality progression tiers.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Control loop behavior flags.
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Per-role model parameters for the three agents.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Process variable measurement weights.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Workspace, checkpoint and log paths.
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// PID controller parameters.
///
/// `kp`, `ki`, `kd` and `dt` are required. Everything else defaults to the
/// limits the loop was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PidConfig {
    /// Proportional gain.
    pub kp: f64,

    /// Integral gain.
    pub ki: f64,

    /// Derivative gain.
    pub kd: f64,

    /// Discrete time step. `dt <= 0` is a valid degraded mode in which the
    /// integral and derivative terms contribute nothing.
    pub dt: f64,

    /// Target quality level the process variable is driven toward.
    #[serde(default = "default_setpoint")]
    pub setpoint: f64,

    /// Lower integral clamp (anti-windup).
    #[serde(default = "default_integral_min")]
    pub integral_min: f64,

    /// Upper integral clamp (anti-windup).
    #[serde(default = "default_integral_max")]
    pub integral_max: f64,

    /// Lower control output clamp.
    #[serde(default = "default_control_min")]
    pub control_min: f64,

    /// Upper control output clamp.
    #[serde(default = "default_control_max")]
    pub control_max: f64,

    /// Sliding window length for oscillation detection.
    #[serde(default = "default_oscillation_window")]
    pub oscillation_window: usize,

    /// Minimum error amplitude (max - min over the window) to flag oscillation.
    #[serde(default = "default_oscillation_threshold")]
    pub oscillation_threshold: f64,

    /// Deadband width applied to the control signal after each compute.
    /// Zero disables the deadband.
    #[serde(default)]
    pub deadband: f64,
}

const fn default_setpoint() -> f64 {
    0.85
}

const fn default_integral_min() -> f64 {
    -10.0
}

const fn default_integral_max() -> f64 {
    10.0
}

const fn default_control_min() -> f64 {
    -5.0
}

const fn default_control_max() -> f64 {
    5.0
}

const fn default_oscillation_window() -> usize {
    10
}

const fn default_oscillation_threshold() -> f64 {
    0.15
}

/// Safety guard thresholds.
///
/// Quality scores are on a 0-10 scale; process variable thresholds are on
/// the PV's [0, 1] scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SafetyConfig {
    /// Hard cap on loop iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Budget ceiling in USD; the budget guard halts the loop at or above it.
    #[serde(default = "default_max_budget_usd")]
    pub max_budget_usd: f64,

    /// PV below this always escalates to human review.
    #[serde(default = "default_human_review_threshold")]
    pub human_review_threshold: f64,

    /// PV below this (when nothing better fires) triggers a rollback.
    #[serde(default = "default_rollback_threshold")]
    pub rollback_threshold: f64,

    /// Minimum PV range over the stagnation window to count as progress.
    #[serde(default = "default_stagnation_threshold")]
    pub stagnation_threshold: f64,

    /// Number of trailing PV samples inspected for stagnation.
    #[serde(default = "default_stagnation_window")]
    pub stagnation_window: usize,

    /// Flat minimum quality score when progression is disabled.
    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: f64,

    /// Whether the minimum quality score rises with iteration count.
    #[serde(default = "default_quality_progression_enabled")]
    pub quality_progression_enabled: bool,

    /// Minimum quality score during the initial phase.
    #[serde(default = "default_min_quality_score_initial")]
    pub min_quality_score_initial: f64,

    /// Minimum quality score during the mid phase.
    #[serde(default = "default_min_quality_score_mid")]
    pub min_quality_score_mid: f64,

    /// Minimum quality score during the final phase.
    #[serde(default = "default_min_quality_score_final")]
    pub min_quality_score_final: f64,

    /// Last iteration of the initial phase (inclusive).
    #[serde(default = "default_initial_phase_end")]
    pub initial_phase_end: u32,

    /// Last iteration of the mid phase (inclusive).
    #[serde(default = "default_mid_phase_end")]
    pub mid_phase_end: u32,
}

const fn default_max_iterations() -> u32 {
    30
}

const fn default_max_budget_usd() -> f64 {
    10.0
}

const fn default_human_review_threshold() -> f64 {
    0.1
}

const fn default_rollback_threshold() -> f64 {
    0.3
}

const fn default_stagnation_threshold() -> f64 {
    0.05
}

const fn default_stagnation_window() -> usize {
    5
}

const fn default_min_quality_score() -> f64 {
    5.0
}

const fn default_quality_progression_enabled() -> bool {
    true
}

const fn default_min_quality_score_initial() -> f64 {
    2.5
}

const fn default_min_quality_score_mid() -> f64 {
    4.5
}

const fn default_min_quality_score_final() -> f64 {
    6.5
}

const fn default_initial_phase_end() -> u32 {
    5
}

const fn default_mid_phase_end() -> u32 {
    15
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_budget_usd: default_max_budget_usd(),
            human_review_threshold: default_human_review_threshold(),
            rollback_threshold: default_rollback_threshold(),
            stagnation_threshold: default_stagnation_threshold(),
            stagnation_window: default_stagnation_window(),
            min_quality_score: default_min_quality_score(),
            quality_progression_enabled: default_quality_progression_enabled(),
            min_quality_score_initial: default_min_quality_score_initial(),
            min_quality_score_mid: default_min_quality_score_mid(),
            min_quality_score_final: default_min_quality_score_final(),
            initial_phase_end: default_initial_phase_end(),
            mid_phase_end: default_mid_phase_end(),
        }
    }
}

/// Control loop behavior flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestrationConfig {
    /// Merge automatically on a passing verdict when lower-priority rules
    /// have not already decided.
    #[serde(default = "default_auto_merge")]
    pub auto_merge: bool,

    /// Create a periodic checkpoint every N iterations.
    #[serde(default = "default_checkpoint_frequency")]
    pub checkpoint_frequency: u32,

    /// Number of recent checkpoints retained on disk; the best checkpoint
    /// always survives pruning.
    #[serde(default = "default_checkpoint_retention")]
    pub checkpoint_retention: usize,

    /// Run the quality gate every N iterations (adjusted at runtime by the
    /// strategy controller; 1 = every iteration).
    #[serde(default = "default_qa_frequency")]
    pub qa_frequency: u32,

    /// Grace period: iterations at or below this merge rather than skip when
    /// no stronger rule fires.
    #[serde(default = "default_early_iteration_cutoff")]
    pub early_iteration_cutoff: u32,

    /// Abort the whole run when an iteration fails, instead of logging and
    /// continuing.
    #[serde(default)]
    pub abort_on_error: bool,

    /// Reset controller state after a rollback decision.
    #[serde(default = "default_reset_controller_on_rollback")]
    pub reset_controller_on_rollback: bool,
}

const fn default_auto_merge() -> bool {
    true
}

const fn default_checkpoint_frequency() -> u32 {
    5
}

const fn default_checkpoint_retention() -> usize {
    10
}

const fn default_qa_frequency() -> u32 {
    1
}

const fn default_early_iteration_cutoff() -> u32 {
    5
}

const fn default_reset_controller_on_rollback() -> bool {
    true
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            auto_merge: default_auto_merge(),
            checkpoint_frequency: default_checkpoint_frequency(),
            checkpoint_retention: default_checkpoint_retention(),
            qa_frequency: default_qa_frequency(),
            early_iteration_cutoff: default_early_iteration_cutoff(),
            abort_on_error: false,
            reset_controller_on_rollback: default_reset_controller_on_rollback(),
        }
    }
}

/// Model parameters for one agent role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentModelConfig {
    /// Model identifier sent to the API.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_max_tokens() -> u32 {
    2000
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "COGPID_API_KEY".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for AgentModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Per-role model parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelsConfig {
    /// Planner agent (produces the task backlog).
    #[serde(default)]
    pub keeper: AgentModelConfig,

    /// Implementer agent (produces patches).
    #[serde(default)]
    pub developer: AgentModelConfig,

    /// Quality gate agent (produces verdicts and quality scores).
    #[serde(default)]
    pub qa: AgentModelConfig,
}

/// Process variable measurement weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsConfig {
    /// Weight per component; keys: `similarity`, `test_pass_rate`,
    /// `lint_score`, `req_coverage`.
    #[serde(default = "default_metric_weights")]
    pub weights: HashMap<String, f64>,

    /// Optional lint command executed in the workspace. Unset means a
    /// neutral lint score of 1.0.
    #[serde(default)]
    pub lint_command: Option<String>,
}

fn default_metric_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("similarity".to_string(), 0.4),
        ("test_pass_rate".to_string(), 0.3),
        ("lint_score".to_string(), 0.2),
        ("req_coverage".to_string(), 0.1),
    ])
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            weights: default_metric_weights(),
            lint_command: None,
        }
    }
}

/// Workspace, checkpoint and log paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RepositoryConfig {
    /// Directory the agents build into.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Directory checkpoints are stored under.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    /// Directory run logs are written to.
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

fn default_base_path() -> String {
    "./workspace".to_string()
}

fn default_checkpoint_path() -> String {
    "./checkpoints".to_string()
}

fn default_log_path() -> String {
    "./logs".to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            checkpoint_path: default_checkpoint_path(),
            log_path: default_log_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
