//! Domain models: configuration, tasks, agent outputs, decisions.

pub mod agent;
pub mod config;
pub mod context;
pub mod decision;
pub mod task;

pub use agent::{
    AgentResponse, AgentUsage, DeveloperPatch, FileChange, QaReport, TestResults, Verdict,
};
pub use config::{
    AgentModelConfig, Config, LoggingConfig, MetricsConfig, ModelsConfig, OrchestrationConfig,
    PidConfig, RepositoryConfig, SafetyConfig,
};
pub use context::LoopContext;
pub use decision::{Decision, DecisionAction, IterationRecord, RunSummary};
pub use task::{Complexity, KeeperPlan, TaskSpec};
