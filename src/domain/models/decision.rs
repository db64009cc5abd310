//! Decisions, per-iteration records and the final run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action selected by the decision policy for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Apply the patch and mark the task completed.
    Merge,
    /// Discard the patch; the task stays on the backlog.
    Reject,
    /// Restore the workspace from the best checkpoint.
    Rollback,
    /// Escalate to a human; no automatic side effect.
    HumanReview,
    /// Take no action this iteration.
    Skip,
}

/// Decision produced per iteration; consumed immediately, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Selected action.
    pub action: DecisionAction,

    /// Why the first matching rule fired.
    pub reason: String,
}

/// Append-only record of one completed loop iteration.
///
/// Written to the iteration log for offline analysis; nothing in the control
/// core reads it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,
    pub pv: f64,
    pub best_pv: f64,
    pub control_value: f64,
    pub decision: Decision,
    pub cost_usd: f64,
}

/// Final result of an orchestration run, returned even after a guard halt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Iterations completed.
    pub iterations: u32,

    /// Best process variable observed.
    pub best_pv: f64,

    /// Iteration at which the best PV occurred.
    pub best_iteration: u32,

    /// Last measured process variable (0.0 when no iteration completed).
    pub final_pv: f64,

    /// Cumulative agent spend in USD.
    pub total_cost_usd: f64,

    /// Full PV history, one entry per completed iteration.
    pub pv_history: Vec<f64>,

    /// Titles of tasks merged during the run.
    pub completed_tasks: Vec<String>,

    /// Guard halt reason, if a safety guard stopped the loop early.
    pub halt_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_snake_case() {
        assert_eq!(
            serde_json::to_string(&DecisionAction::HumanReview).unwrap(),
            "\"human_review\""
        );
        let rollback: DecisionAction = serde_json::from_str("\"rollback\"").unwrap();
        assert_eq!(rollback, DecisionAction::Rollback);
    }

    #[test]
    fn test_iteration_record_roundtrip() {
        let record = IterationRecord {
            iteration: 3,
            timestamp: Utc::now(),
            pv: 0.42,
            best_pv: 0.5,
            control_value: 1.25,
            decision: Decision {
                action: DecisionAction::Merge,
                reason: "quality 7.0 >= threshold 4.5".to_string(),
            },
            cost_usd: 0.015,
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: IterationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.iteration, 3);
        assert_eq!(parsed.decision.action, DecisionAction::Merge);
        assert!((parsed.pv - 0.42).abs() < f64::EPSILON);
    }
}
