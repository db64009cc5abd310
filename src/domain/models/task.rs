//! Task backlog models produced by the planner agent.

use serde::{Deserialize, Serialize};

/// Estimated implementation complexity of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

/// One unit of work in the planner's ordered backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskSpec {
    /// Planner-assigned identifier, unique within the plan.
    pub id: String,

    /// Short title.
    pub title: String,

    /// What to build and why.
    pub description: String,

    /// Priority 0-10, higher first.
    #[serde(default)]
    pub priority: u8,

    /// Estimated implementation complexity.
    #[serde(default)]
    pub estimated_complexity: Complexity,

    /// Ids of tasks this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Conditions that make the task done.
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

/// Ordered plan returned by the planner agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeeperPlan {
    /// Tasks in execution order.
    pub tasks: Vec<TaskSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_spec_deserializes_with_defaults() {
        let json = r#"{"id":"t1","title":"Scaffold","description":"Create project layout"}"#;
        let task: TaskSpec = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.priority, 0);
        assert_eq!(task.estimated_complexity, Complexity::Medium);
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_complexity_snake_case() {
        assert_eq!(serde_json::to_string(&Complexity::Low).unwrap(), "\"low\"");
        let high: Complexity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(high, Complexity::High);
    }
}
