//! Closed-loop control core: PID controller, decision policy, stagnation
//! detection. Pure computation, no I/O.

pub mod pid;
pub mod policy;
pub mod stagnation;

pub use pid::{
    apply_deadband, compute_pid_with_limits, detect_oscillation, ControllerState, PidController,
    PidGains,
};
pub use policy::{DecisionInputs, DecisionPolicy};
pub use stagnation::detect_stagnation;
