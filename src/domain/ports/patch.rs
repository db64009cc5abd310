//! Port for applying a patch to the workspace.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::error::PatchError;
use crate::domain::models::DeveloperPatch;

/// Opaque patch application.
///
/// The core never parses diffs; applying a patch either succeeds or fails as
/// a whole.
#[async_trait]
pub trait PatchApplier: Send + Sync {
    /// Write the patch into `workspace`.
    async fn apply(&self, patch: &DeveloperPatch, workspace: &Path) -> Result<(), PatchError>;
}
