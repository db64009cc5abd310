//! Scriptable in-memory agent runner for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::AgentError;
use crate::domain::models::{
    AgentResponse, AgentUsage, DeveloperPatch, FileChange, KeeperPlan, LoopContext, QaReport,
    TaskSpec, TestResults, Verdict,
};
use crate::domain::ports::AgentRunner;

/// [`AgentRunner`] that replays queued outputs.
///
/// Each call pops the next queued item for its role; an exhausted queue
/// repeats the last default instead of erroring, so a test only needs to
/// script the iterations it cares about. Every call costs a fixed
/// `cost_per_call` for budget guard tests.
pub struct MockAgentRunner {
    plans: Mutex<VecDeque<KeeperPlan>>,
    patches: Mutex<VecDeque<DeveloperPatch>>,
    reports: Mutex<VecDeque<QaReport>>,
    cost_per_call: f64,
}

impl Default for MockAgentRunner {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl MockAgentRunner {
    pub fn new(cost_per_call: f64) -> Self {
        Self {
            plans: Mutex::new(VecDeque::new()),
            patches: Mutex::new(VecDeque::new()),
            reports: Mutex::new(VecDeque::new()),
            cost_per_call,
        }
    }

    pub fn push_plan(&self, plan: KeeperPlan) {
        self.plans.lock().unwrap().push_back(plan);
    }

    pub fn push_patch(&self, patch: DeveloperPatch) {
        self.patches.lock().unwrap().push_back(patch);
    }

    pub fn push_report(&self, report: QaReport) {
        self.reports.lock().unwrap().push_back(report);
    }

    /// A single-task plan, the common case in tests.
    pub fn single_task_plan(title: &str) -> KeeperPlan {
        KeeperPlan {
            tasks: vec![TaskSpec {
                id: format!("TASK-{title}"),
                title: title.to_string(),
                description: format!("implement {title}"),
                priority: 5,
                estimated_complexity: Default::default(),
                dependencies: vec![],
                acceptance_criteria: vec![],
            }],
        }
    }

    /// A passing report at the given quality score.
    pub fn passing_report(quality_score: f64) -> QaReport {
        QaReport {
            verdict: Verdict::Pass,
            quality_score,
            issues: vec![],
            test_cases: vec![],
            test_results: TestResults {
                total: 10,
                passed: 10,
                failed: 0,
                skipped: 0,
            },
            feedback: String::new(),
        }
    }

    fn usage(&self) -> AgentUsage {
        AgentUsage {
            input_tokens: 100,
            output_tokens: 100,
            cost_usd: self.cost_per_call,
        }
    }
}

#[async_trait]
impl AgentRunner for MockAgentRunner {
    async fn plan(&self, ctx: &LoopContext) -> Result<AgentResponse<KeeperPlan>, AgentError> {
        let output = self
            .plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::single_task_plan(&format!("task-{}", ctx.iteration)));
        Ok(AgentResponse {
            output,
            usage: self.usage(),
        })
    }

    async fn implement(
        &self,
        task: &TaskSpec,
        _ctx: &LoopContext,
    ) -> Result<AgentResponse<DeveloperPatch>, AgentError> {
        let output = self.patches.lock().unwrap().pop_front().unwrap_or_else(|| {
            DeveloperPatch {
                summary: format!("mock patch for {}", task.title),
                files: vec![FileChange {
                    path: format!("notes/{}.md", task.id),
                    content: format!("# {}\n", task.title),
                }],
                ..Default::default()
            }
        });
        Ok(AgentResponse {
            output,
            usage: self.usage(),
        })
    }

    async fn review(
        &self,
        _patch: &DeveloperPatch,
        _ctx: &LoopContext,
    ) -> Result<AgentResponse<QaReport>, AgentError> {
        let output = self
            .reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::passing_report(7.0));
        Ok(AgentResponse {
            output,
            usage: self.usage(),
        })
    }
}
