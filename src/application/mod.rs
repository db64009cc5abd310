//! Application layer: the iteration orchestrator and safety guards.

pub mod guards;
pub mod orchestrator;

pub use guards::{GuardVerdict, SafetyGuards};
pub use orchestrator::IterationOrchestrator;
