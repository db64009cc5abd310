//! Cogpid - Closed-Loop Agent Orchestration
//!
//! Cogpid drives three LLM agents (a planner, an implementer and a quality
//! gate) through an iterative build loop governed by a discrete PID
//! controller, a rule-ordered decision policy and hard safety guards.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): controller, decision policy, stagnation
//!   detection, typed models and port traits. Pure computation, no I/O.
//! - **Application Layer** (`application`): the iteration orchestrator and
//!   safety guards.
//! - **Adapters** (`adapters`): implementations of the domain ports, from
//!   the chat-completions agent runner to the filesystem checkpoint store.
//! - **Infrastructure Layer** (`infrastructure`): configuration loading and
//!   logging bootstrap.
//! - **CLI Layer** (`cli`): command-line interface.
//!
//! # Example
//!
//! ```ignore
//! use cogpid::application::IterationOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Wire adapters and run the loop
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use application::{GuardVerdict, IterationOrchestrator, SafetyGuards};
pub use domain::control::{DecisionPolicy, PidController, PidGains};
pub use domain::models::{
    Config, Decision, DecisionAction, DeveloperPatch, IterationRecord, KeeperPlan, LoopContext,
    QaReport, RunSummary, TaskSpec, Verdict,
};
pub use domain::ports::{
    AgentRunner, CheckpointStore, IterationSink, PatchApplier, ProcessMeasure,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
