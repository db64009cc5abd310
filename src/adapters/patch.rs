//! Patch application by whole-file writes.

use std::path::{Component, Path};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::domain::error::PatchError;
use crate::domain::models::DeveloperPatch;
use crate::domain::ports::PatchApplier;

/// [`PatchApplier`] that writes each file payload under the workspace.
///
/// Paths are kept inside the workspace: absolute paths and `..` components
/// are rejected as I/O errors rather than followed.
#[derive(Debug, Default)]
pub struct WorkspacePatchApplier;

impl WorkspacePatchApplier {
    pub fn new() -> Self {
        Self
    }
}

fn sanitize(path: &str) -> Result<&Path, PatchError> {
    let path = Path::new(path);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(PatchError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("patch path escapes workspace: {}", path.display()),
        )));
    }
    Ok(path)
}

#[async_trait]
impl PatchApplier for WorkspacePatchApplier {
    async fn apply(&self, patch: &DeveloperPatch, workspace: &Path) -> Result<(), PatchError> {
        if patch.files.is_empty() {
            return Err(PatchError::EmptyPatch);
        }

        fs::create_dir_all(workspace).await?;
        for change in &patch.files {
            let relative = sanitize(&change.path)?;
            let target = workspace.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&target, &change.content).await?;
            debug!(path = %relative.display(), bytes = change.content.len(), "file written");
        }
        info!(files = patch.files.len(), "patch applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FileChange;
    use tempfile::TempDir;

    fn patch_with(path: &str, content: &str) -> DeveloperPatch {
        DeveloperPatch {
            summary: "test patch".to_string(),
            files: vec![FileChange {
                path: path.to_string(),
                content: content.to_string(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_apply_writes_nested_files() {
        let dir = TempDir::new().unwrap();
        let applier = WorkspacePatchApplier::new();

        applier
            .apply(&patch_with("src/lib.rs", "pub fn f() {}"), dir.path())
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("src/lib.rs")).unwrap();
        assert_eq!(written, "pub fn f() {}");
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let dir = TempDir::new().unwrap();
        let applier = WorkspacePatchApplier::new();
        let result = applier.apply(&DeveloperPatch::default(), dir.path()).await;
        assert!(matches!(result, Err(PatchError::EmptyPatch)));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let applier = WorkspacePatchApplier::new();
        let result = applier
            .apply(&patch_with("../outside.txt", "nope"), dir.path())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_absolute_path_rejected() {
        let dir = TempDir::new().unwrap();
        let applier = WorkspacePatchApplier::new();
        let result = applier
            .apply(&patch_with("/etc/hosts", "nope"), dir.path())
            .await;
        assert!(result.is_err());
    }
}
