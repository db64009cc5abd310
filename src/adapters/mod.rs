//! Adapters: concrete implementations of the domain ports.

pub mod agents;
pub mod checkpoint;
pub mod measure;
pub mod patch;

pub use agents::{ChatAgentRunner, MockAgentRunner};
pub use checkpoint::FsCheckpointStore;
pub use measure::CompositeMeasure;
pub use patch::WorkspacePatchApplier;
