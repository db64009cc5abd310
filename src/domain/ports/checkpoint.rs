//! Port for checkpoint creation and rollback.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::CheckpointError;

/// Metadata describing one stored checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub id: Uuid,
    pub iteration: u32,
    pub pv: f64,
    pub created_at: DateTime<Utc>,
    pub is_best: bool,
}

/// Snapshot/restore service for the workspace.
///
/// An explicitly owned object injected into the orchestrator at construction;
/// it tracks the best-known checkpoint itself.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Snapshot the workspace. `is_best` marks this checkpoint as the new
    /// best-known state.
    async fn create(
        &self,
        workspace: &Path,
        pv: f64,
        iteration: u32,
        is_best: bool,
    ) -> Result<Uuid, CheckpointError>;

    /// Restore `workspace` from the checkpoint `id`.
    async fn rollback(&self, id: Uuid, workspace: &Path) -> Result<(), CheckpointError>;

    /// Id of the best-known checkpoint, if any exists yet.
    async fn best(&self) -> Option<Uuid>;

    /// All checkpoints created so far, oldest first.
    async fn history(&self) -> Vec<CheckpointMeta>;

    /// Drop old checkpoints beyond a retention count. Implementations may
    /// keep extra checkpoints on top of the count, such as the best one.
    async fn cleanup(&self, _keep_last_n: usize) -> Result<(), CheckpointError> {
        Ok(())
    }
}
