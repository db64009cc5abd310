//! Domain layer: models, control algorithms, ports and error types.
//!
//! Nothing in this layer performs I/O. Adapters and infrastructure depend on
//! the domain, never the other way round.

pub mod control;
pub mod error;
pub mod models;
pub mod ports;
