//! Shared per-iteration context handed to agent collaborators.

use std::path::PathBuf;

/// Snapshot of loop state the agents need to do their work.
///
/// Rebuilt by the orchestrator each iteration; agents never mutate it.
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Project description / goal the run is driving toward.
    pub setpoint: String,

    /// Workspace the agents build into.
    pub workspace: PathBuf,

    /// Current iteration number, 1-based.
    pub iteration: u32,

    /// Titles of tasks already merged.
    pub completed_tasks: Vec<String>,

    /// Current sampling temperature for the implementer, as adjusted by the
    /// strategy controller from the control signal.
    pub developer_temperature: f64,

    /// Target quality level (the PID setpoint).
    pub quality_target: f64,
}
