//! Domain-level error types.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by agent collaborators (planner, implementer, quality gate).
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Agent call timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed agent response: {0}")]
    MalformedResponse(String),
}

/// Errors raised by the checkpoint store.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {0}")]
    NotFound(Uuid),

    #[error("Checkpoint metadata invalid: {0}")]
    Metadata(String),

    #[error("Workspace path does not exist: {0}")]
    MissingWorkspace(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while measuring the process variable.
#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("Lint command failed to spawn: {0}")]
    Lint(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while applying a patch to the workspace.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch contains no file payloads")]
    EmptyPatch,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
