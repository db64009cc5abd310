//! Typed outputs of the implementer and quality-gate agents.

use serde::{Deserialize, Serialize};

/// Pass/fail verdict from the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Aggregate test execution counts reported by the quality gate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TestResults {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl TestResults {
    /// Fraction of tests that passed, in [0, 1]. No tests counts as zero.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.passed) / f64::from(self.total)
        }
    }
}

/// One whole-file payload inside a patch.
///
/// Patch application is an opaque write of complete file contents; the core
/// never parses diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileChange {
    /// Path relative to the workspace root.
    pub path: String,

    /// Full new contents of the file.
    pub content: String,
}

/// Output of the implementer agent for one task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeveloperPatch {
    /// Human-readable summary of the change.
    #[serde(default)]
    pub summary: String,

    /// Whole-file payloads to write into the workspace.
    #[serde(default)]
    pub files: Vec<FileChange>,

    /// Paths the agent reports as modified.
    #[serde(default)]
    pub files_modified: Vec<String>,

    /// Paths the agent reports as newly created.
    #[serde(default)]
    pub files_created: Vec<String>,

    /// Risks the agent flagged.
    #[serde(default)]
    pub risks: Vec<String>,

    /// Free-form implementation notes.
    #[serde(default)]
    pub implementation_notes: String,

    /// Suggested tests for the quality gate.
    #[serde(default)]
    pub testing_suggestions: Vec<String>,
}

/// Output of the quality-gate agent for one patch.
///
/// `quality_score` is on a 0-10 scale; the process variable stays on [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QaReport {
    pub verdict: Verdict,

    /// Quality score on a 0-10 scale.
    pub quality_score: f64,

    /// Issues found in the patch.
    #[serde(default)]
    pub issues: Vec<String>,

    /// Test cases the gate exercised or proposed.
    #[serde(default)]
    pub test_cases: Vec<String>,

    /// Aggregate test counts.
    #[serde(default)]
    pub test_results: TestResults,

    /// Free-form feedback for the next iteration.
    #[serde(default)]
    pub feedback: String,
}

impl QaReport {
    /// Conservative report used when the gate's response cannot be parsed:
    /// fail with zero quality, so the policy never merges on garbage.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Fail,
            quality_score: 0.0,
            issues: vec![reason.into()],
            test_cases: vec![],
            test_results: TestResults::default(),
            feedback: String::new(),
        }
    }
}

/// Token and cost accounting for one agent call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl AgentUsage {
    /// Sum two usages.
    pub fn add(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cost_usd += other.cost_usd;
    }
}

/// An agent output together with its usage accounting.
#[derive(Debug, Clone)]
pub struct AgentResponse<T> {
    pub output: T,
    pub usage: AgentUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_rate_empty() {
        assert!((TestResults::default().pass_rate()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pass_rate_partial() {
        let results = TestResults {
            total: 8,
            passed: 6,
            failed: 2,
            skipped: 0,
        };
        assert!((results.pass_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fallback_report_never_merges() {
        let report = QaReport::fallback("unparseable response");
        assert_eq!(report.verdict, Verdict::Fail);
        assert!(report.quality_score.abs() < f64::EPSILON);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_verdict_snake_case() {
        assert_eq!(serde_json::to_string(&Verdict::Pass).unwrap(), "\"pass\"");
        let fail: Verdict = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(fail, Verdict::Fail);
    }

    #[test]
    fn test_usage_accumulates() {
        let mut total = AgentUsage::default();
        total.add(AgentUsage {
            input_tokens: 100,
            output_tokens: 50,
            cost_usd: 0.01,
        });
        total.add(AgentUsage {
            input_tokens: 200,
            output_tokens: 80,
            cost_usd: 0.02,
        });
        assert_eq!(total.input_tokens, 300);
        assert_eq!(total.output_tokens, 130);
        assert!((total.cost_usd - 0.03).abs() < 1e-12);
    }
}
