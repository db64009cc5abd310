//! Iteration orchestrator: drives the plan / implement / review / decide loop
//! under PID control and safety guards.
//!
//! The loop is strictly sequential. Each iteration asks the planner for a
//! task, the implementer for a patch and the quality gate for a verdict,
//! computes the control signal from the previous iteration's process
//! variable, selects an action through the decision policy, applies side
//! effects, then re-measures the process variable. Guards run last and may
//! halt the run. Whatever happens, the workspace ends on the best-recorded
//! checkpoint and the caller gets a [`RunSummary`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::application::guards::{GuardVerdict, SafetyGuards};
use crate::domain::control::{DecisionInputs, DecisionPolicy, PidController};
use crate::domain::models::{
    Config, Decision, DecisionAction, IterationRecord, LoopContext, QaReport, RunSummary,
    TestResults,
};
use crate::domain::ports::{
    AgentRunner, CheckpointStore, IterationSink, PatchApplier, ProcessMeasure,
};

/// Developer temperature adjustment step applied by the strategy controller.
const TEMPERATURE_STEP: f64 = 0.2;
/// Allowed developer temperature range.
const TEMPERATURE_RANGE: (f64, f64) = (0.1, 1.0);

/// Mutable state of one orchestration run.
#[derive(Debug)]
struct RunState {
    previous_pv: f64,
    pv_history: Vec<f64>,
    best_pv: f64,
    best_iteration: u32,
    completed_tasks: Vec<String>,
    total_cost_usd: f64,
    developer_temperature: f64,
    qa_frequency: u32,
    last_qa_report: Option<QaReport>,
    halt_reason: Option<String>,
}

/// Outcome of one completed iteration, used for the audit record.
struct IterationOutcome {
    pv: f64,
    control: f64,
    decision: Decision,
    cost_usd: f64,
}

/// Drives the closed control loop end to end.
pub struct IterationOrchestrator {
    config: Config,
    controller: PidController,
    policy: DecisionPolicy,
    guards: SafetyGuards,
    workspace: PathBuf,

    agents: Arc<dyn AgentRunner>,
    measure: Arc<dyn ProcessMeasure>,
    checkpoints: Arc<dyn CheckpointStore>,
    patcher: Arc<dyn PatchApplier>,
    sink: Arc<dyn IterationSink>,
}

impl IterationOrchestrator {
    /// Wire the orchestrator from configuration and injected ports.
    pub fn new(
        config: Config,
        agents: Arc<dyn AgentRunner>,
        measure: Arc<dyn ProcessMeasure>,
        checkpoints: Arc<dyn CheckpointStore>,
        patcher: Arc<dyn PatchApplier>,
        sink: Arc<dyn IterationSink>,
    ) -> Self {
        let controller = PidController::new(&config.pid);
        let policy = DecisionPolicy::from_config(&config);
        let guards = SafetyGuards::new(&config.safety);
        let workspace = PathBuf::from(&config.repository.base_path);
        Self {
            config,
            controller,
            policy,
            guards,
            workspace,
            agents,
            measure,
            checkpoints,
            patcher,
            sink,
        }
    }

    /// Run the loop until the iteration cap, an empty backlog or a guard halt.
    pub async fn run(&mut self, setpoint: &str) -> Result<RunSummary> {
        let max_iterations = self.config.safety.max_iterations;
        info!(setpoint, max_iterations, "starting orchestration run");

        // Baseline measurement: the first iteration's decision consumes the
        // PV of the workspace as it stands, not a sentinel zero.
        let initial_pv = self
            .measure
            .measure(setpoint, &self.workspace, &TestResults::default())
            .await
            .context("initial process variable measurement failed")?;
        info!(initial_pv, "baseline measured");

        let mut state = RunState {
            previous_pv: initial_pv,
            pv_history: Vec::new(),
            best_pv: 0.0,
            best_iteration: 0,
            completed_tasks: Vec::new(),
            total_cost_usd: 0.0,
            developer_temperature: self.config.models.developer.temperature,
            qa_frequency: self.config.orchestration.qa_frequency.max(1),
            last_qa_report: None,
            halt_reason: None,
        };

        let mut iterations_run = 0;
        for iteration in 1..=max_iterations {
            match self.run_iteration(setpoint, iteration, &mut state).await {
                Ok(Some(outcome)) => {
                    iterations_run = iteration;
                    self.record(iteration, &state, &outcome);

                    let verdict = self.guards.evaluate(
                        state.total_cost_usd,
                        &state.pv_history,
                        self.controller.is_oscillating(),
                    );
                    if let GuardVerdict::Halt(reason) = verdict {
                        warn!(%reason, "safety guard halted the run");
                        state.halt_reason = Some(reason);
                        break;
                    }
                }
                Ok(None) => {
                    info!(iteration, "planner returned an empty backlog, run complete");
                    break;
                }
                Err(e) => {
                    iterations_run = iteration;
                    error!(iteration, error = %e, "iteration failed");
                    if self.config.orchestration.abort_on_error {
                        state.halt_reason = Some(format!("iteration {iteration} failed: {e}"));
                        break;
                    }
                    // Agent calls made before the failure have already been
                    // billed; the budget guard must still see them.
                    let verdict = self.guards.evaluate(
                        state.total_cost_usd,
                        &state.pv_history,
                        self.controller.is_oscillating(),
                    );
                    if let GuardVerdict::Halt(reason) = verdict {
                        warn!(%reason, "safety guard halted the run");
                        state.halt_reason = Some(reason);
                        break;
                    }
                }
            }
        }

        self.finalize(&state).await;

        Ok(RunSummary {
            iterations: iterations_run,
            best_pv: state.best_pv,
            best_iteration: state.best_iteration,
            final_pv: state.pv_history.last().copied().unwrap_or(0.0),
            total_cost_usd: state.total_cost_usd,
            pv_history: state.pv_history,
            completed_tasks: state.completed_tasks,
            halt_reason: state.halt_reason,
        })
    }

    /// One full iteration. Returns `Ok(None)` when the backlog is empty.
    async fn run_iteration(
        &mut self,
        setpoint: &str,
        iteration: u32,
        state: &mut RunState,
    ) -> Result<Option<IterationOutcome>> {
        // Spend is booked against the run as soon as each agent call
        // returns, so an iteration that later fails still counts toward
        // the budget ceiling.
        let cost_start = state.total_cost_usd;
        let ctx = LoopContext {
            setpoint: setpoint.to_string(),
            workspace: self.workspace.clone(),
            iteration,
            completed_tasks: state.completed_tasks.clone(),
            developer_temperature: state.developer_temperature,
            quality_target: self.config.pid.setpoint,
        };

        let plan = self.agents.plan(&ctx).await.context("planner call failed")?;
        state.total_cost_usd += plan.usage.cost_usd;

        let Some(task) = plan
            .output
            .tasks
            .iter()
            .find(|t| !state.completed_tasks.contains(&t.title))
            .cloned()
        else {
            return Ok(None);
        };
        info!(iteration, task = %task.title, "task selected");

        let patch = self
            .agents
            .implement(&task, &ctx)
            .await
            .context("implementer call failed")?;
        state.total_cost_usd += patch.usage.cost_usd;
        let patch = patch.output;

        // Run the gate on its configured cadence; off-cadence iterations
        // reuse the previous report. The first review always runs.
        let report = if state.last_qa_report.is_none() || iteration % state.qa_frequency == 0 {
            let response = self
                .agents
                .review(&patch, &ctx)
                .await
                .context("quality gate call failed")?;
            state.total_cost_usd += response.usage.cost_usd;
            state.last_qa_report = Some(response.output.clone());
            response.output
        } else {
            // Checked above.
            state
                .last_qa_report
                .clone()
                .unwrap_or_else(|| QaReport::fallback("no prior review available"))
        };

        // Control from the previous iteration's PV, before any side effect.
        let mut control = self
            .controller
            .compute(self.config.pid.setpoint, state.previous_pv);
        if self.config.pid.deadband > 0.0 {
            control = self.controller.apply_hysteresis(self.config.pid.deadband);
        }

        self.adjust_strategy(control, state);

        let decision = self.policy.decide(DecisionInputs {
            pv: state.previous_pv,
            verdict: report.verdict,
            quality_score: report.quality_score,
            control_value: control,
            iteration,
        });
        info!(
            iteration,
            action = ?decision.action,
            reason = %decision.reason,
            control,
            "decision"
        );

        match decision.action {
            DecisionAction::Merge => {
                self.patcher
                    .apply(&patch, &self.workspace)
                    .await
                    .context("patch application failed")?;
                state.completed_tasks.push(task.title.clone());
            }
            DecisionAction::Rollback => {
                if let Some(best) = self.checkpoints.best().await {
                    self.checkpoints
                        .rollback(best, &self.workspace)
                        .await
                        .context("rollback to best checkpoint failed")?;
                    if self.config.orchestration.reset_controller_on_rollback {
                        self.controller.reset();
                    }
                } else {
                    warn!(iteration, "rollback requested but no checkpoint exists yet");
                }
            }
            DecisionAction::HumanReview => {
                warn!(iteration, "escalated to human review");
            }
            DecisionAction::Reject | DecisionAction::Skip => {}
        }

        let pv = self
            .measure
            .measure(setpoint, &self.workspace, &report.test_results)
            .await
            .context("process variable measurement failed")?;
        state.pv_history.push(pv);

        let checkpointed = if pv > state.best_pv {
            state.best_pv = pv;
            state.best_iteration = iteration;
            self.checkpoints
                .create(&self.workspace, pv, iteration, true)
                .await
                .context("best checkpoint creation failed")?;
            true
        } else if iteration % self.config.orchestration.checkpoint_frequency.max(1) == 0 {
            self.checkpoints
                .create(&self.workspace, pv, iteration, false)
                .await
                .context("periodic checkpoint creation failed")?;
            true
        } else {
            false
        };
        if checkpointed {
            // Retention is best-effort; a failed prune must not fail the
            // iteration that just checkpointed successfully.
            if let Err(e) = self
                .checkpoints
                .cleanup(self.config.orchestration.checkpoint_retention)
                .await
            {
                warn!(error = %e, "checkpoint cleanup failed");
            }
        }

        state.previous_pv = pv;

        Ok(Some(IterationOutcome {
            pv,
            control,
            decision,
            cost_usd: state.total_cost_usd - cost_start,
        }))
    }

    /// Controller state, for inspection after a run.
    pub fn controller(&self) -> &PidController {
        &self.controller
    }

    /// Nudge agent strategy from the control signal. A strongly positive
    /// control (far below target) narrows the implementer's sampling and
    /// reviews every iteration; a strongly negative one loosens sampling and
    /// relaxes the review cadence.
    fn adjust_strategy(&self, control: f64, state: &mut RunState) {
        if control > 2.0 {
            state.developer_temperature = (state.developer_temperature - TEMPERATURE_STEP)
                .clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);
        } else if control < -2.0 {
            state.developer_temperature = (state.developer_temperature + TEMPERATURE_STEP)
                .clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);
        }

        if control > 3.0 {
            state.qa_frequency = 1;
        } else if control < -1.0 {
            state.qa_frequency = 2;
        }
    }

    fn record(&self, iteration: u32, state: &RunState, outcome: &IterationOutcome) {
        self.sink.record(&IterationRecord {
            iteration,
            timestamp: Utc::now(),
            pv: outcome.pv,
            best_pv: state.best_pv,
            control_value: outcome.control,
            decision: outcome.decision.clone(),
            cost_usd: outcome.cost_usd,
        });
    }

    /// Leave the workspace on the best-recorded state.
    async fn finalize(&self, state: &RunState) {
        let final_pv = state.pv_history.last().copied().unwrap_or(0.0);
        if final_pv >= state.best_pv {
            return;
        }
        if let Some(best) = self.checkpoints.best().await {
            match self.checkpoints.rollback(best, &self.workspace).await {
                Ok(()) => info!(
                    best_pv = state.best_pv,
                    best_iteration = state.best_iteration,
                    "workspace restored to best checkpoint"
                ),
                Err(e) => error!(error = %e, "final rollback to best checkpoint failed"),
            }
        }
    }
}
