//! Outbound ports: traits the application core depends on, implemented by
//! adapters at the edges.

pub mod agent_runner;
pub mod checkpoint;
pub mod iteration_sink;
pub mod measure;
pub mod patch;

pub use agent_runner::AgentRunner;
pub use checkpoint::{CheckpointMeta, CheckpointStore};
pub use iteration_sink::IterationSink;
pub use measure::ProcessMeasure;
pub use patch::PatchApplier;
