//! Port for the three agent collaborators.

use async_trait::async_trait;

use crate::domain::error::AgentError;
use crate::domain::models::{
    AgentResponse, DeveloperPatch, KeeperPlan, LoopContext, QaReport, TaskSpec,
};

/// Abstraction over the planner, implementer and quality-gate agents.
///
/// Each call is a blocking request/response from the control loop's point of
/// view and is treated as atomic: a failure must leave no partial state
/// behind. Implementations must be `Send + Sync`.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Ask the planner for an ordered task backlog.
    async fn plan(&self, ctx: &LoopContext) -> Result<AgentResponse<KeeperPlan>, AgentError>;

    /// Ask the implementer for a patch addressing `task`.
    async fn implement(
        &self,
        task: &TaskSpec,
        ctx: &LoopContext,
    ) -> Result<AgentResponse<DeveloperPatch>, AgentError>;

    /// Ask the quality gate to review `patch`.
    async fn review(
        &self,
        patch: &DeveloperPatch,
        ctx: &LoopContext,
    ) -> Result<AgentResponse<QaReport>, AgentError>;
}
