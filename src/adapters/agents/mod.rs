//! Agent runner adapters.

pub mod api;
pub mod mock;

pub use api::ChatAgentRunner;
pub use mock::MockAgentRunner;
