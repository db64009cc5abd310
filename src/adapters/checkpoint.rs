//! Filesystem checkpoint store.
//!
//! Each checkpoint is a full snapshot copy of the workspace under the
//! checkpoint root, named by its id, with a `metadata.json` beside the
//! copied tree. Build artifacts and VCS internals are excluded from the
//! snapshot. The best-pointer lives in memory for the duration of a run.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::error::CheckpointError;
use crate::domain::ports::{CheckpointMeta, CheckpointStore};

/// Directory names never included in a snapshot.
const EXCLUDED_DIRS: &[&str] = &[".git", "target", "node_modules", "__pycache__"];

const METADATA_FILE: &str = "metadata.json";
const SNAPSHOT_DIR: &str = "snapshot";

#[derive(Debug, Default)]
struct Index {
    history: Vec<CheckpointMeta>,
    best: Option<Uuid>,
}

/// [`CheckpointStore`] backed by snapshot directories on disk.
pub struct FsCheckpointStore {
    root: PathBuf,
    index: RwLock<Index>,
}

impl FsCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: RwLock::new(Index::default()),
        }
    }

    fn checkpoint_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }
}

#[async_trait]
impl CheckpointStore for FsCheckpointStore {
    async fn create(
        &self,
        workspace: &Path,
        pv: f64,
        iteration: u32,
        is_best: bool,
    ) -> Result<Uuid, CheckpointError> {
        if !workspace.exists() {
            return Err(CheckpointError::MissingWorkspace(workspace.to_path_buf()));
        }

        let id = Uuid::new_v4();
        let meta = CheckpointMeta {
            id,
            iteration,
            pv,
            created_at: Utc::now(),
            is_best,
        };

        let dir = self.checkpoint_dir(id);
        let snapshot = dir.join(SNAPSHOT_DIR);
        let source = workspace.to_path_buf();
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| CheckpointError::Metadata(e.to_string()))?;

        task::spawn_blocking(move || -> Result<(), CheckpointError> {
            fs::create_dir_all(&snapshot)?;
            copy_tree(&source, &snapshot)?;
            fs::write(dir.join(METADATA_FILE), meta_json)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        let mut index = self.index.write().await;
        index.history.push(meta);
        if is_best {
            index.best = Some(id);
        }
        info!(%id, iteration, pv, is_best, "checkpoint created");
        Ok(id)
    }

    async fn rollback(&self, id: Uuid, workspace: &Path) -> Result<(), CheckpointError> {
        let snapshot = self.checkpoint_dir(id).join(SNAPSHOT_DIR);
        if !snapshot.exists() {
            return Err(CheckpointError::NotFound(id));
        }

        let target = workspace.to_path_buf();
        task::spawn_blocking(move || -> Result<(), CheckpointError> {
            if target.exists() {
                fs::remove_dir_all(&target)?;
            }
            fs::create_dir_all(&target)?;
            copy_tree(&snapshot, &target)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        info!(%id, "workspace restored from checkpoint");
        Ok(())
    }

    async fn best(&self) -> Option<Uuid> {
        self.index.read().await.best
    }

    async fn history(&self) -> Vec<CheckpointMeta> {
        self.index.read().await.history.clone()
    }

    /// Delete old non-best checkpoints, keeping the most recent
    /// `keep_last_n` plus the best one.
    async fn cleanup(&self, keep_last_n: usize) -> Result<(), CheckpointError> {
        let mut index = self.index.write().await;
        let best = index.best;
        let total = index.history.len();
        if total <= keep_last_n {
            return Ok(());
        }

        let mut removable: Vec<Uuid> = index
            .history
            .iter()
            .take(total - keep_last_n)
            .map(|m| m.id)
            .filter(|id| Some(*id) != best)
            .collect();

        for id in removable.drain(..) {
            let dir = self.checkpoint_dir(id);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            index.history.retain(|m| m.id != id);
            debug!(%id, "old checkpoint removed");
        }
        Ok(())
    }
}

/// Recursively copy `src` into `dst`, skipping excluded directories.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let path = entry.path();
        if path.is_dir() {
            if EXCLUDED_DIRS
                .iter()
                .any(|excluded| name.to_string_lossy() == *excluded)
            {
                continue;
            }
            let child = dst.join(&name);
            fs::create_dir_all(&child)?;
            copy_tree(&path, &child)?;
        } else {
            fs::copy(&path, dst.join(&name))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace_with_file(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.rs"), content).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_create_and_rollback_restores_content() {
        let checkpoints = TempDir::new().unwrap();
        let store = FsCheckpointStore::new(checkpoints.path());
        let workspace = workspace_with_file("fn main() {}");

        let id = store
            .create(workspace.path(), 0.5, 1, true)
            .await
            .unwrap();

        fs::write(workspace.path().join("main.rs"), "broken").unwrap();
        store.rollback(id, workspace.path()).await.unwrap();

        let restored = fs::read_to_string(workspace.path().join("main.rs")).unwrap();
        assert_eq!(restored, "fn main() {}");
    }

    #[tokio::test]
    async fn test_best_pointer_follows_best_checkpoints() {
        let checkpoints = TempDir::new().unwrap();
        let store = FsCheckpointStore::new(checkpoints.path());
        let workspace = workspace_with_file("x");

        assert!(store.best().await.is_none());
        let a = store.create(workspace.path(), 0.3, 1, true).await.unwrap();
        assert_eq!(store.best().await, Some(a));

        // Non-best checkpoint does not move the pointer.
        store.create(workspace.path(), 0.2, 2, false).await.unwrap();
        assert_eq!(store.best().await, Some(a));

        let b = store.create(workspace.path(), 0.6, 3, true).await.unwrap();
        assert_eq!(store.best().await, Some(b));
    }

    #[tokio::test]
    async fn test_excluded_dirs_not_snapshotted() {
        let checkpoints = TempDir::new().unwrap();
        let store = FsCheckpointStore::new(checkpoints.path());
        let workspace = workspace_with_file("x");
        fs::create_dir(workspace.path().join("target")).unwrap();
        fs::write(workspace.path().join("target/blob"), "artifact").unwrap();

        let id = store.create(workspace.path(), 0.5, 1, true).await.unwrap();
        store.rollback(id, workspace.path()).await.unwrap();

        assert!(workspace.path().join("main.rs").exists());
        assert!(!workspace.path().join("target").exists());
    }

    #[tokio::test]
    async fn test_rollback_unknown_id() {
        let checkpoints = TempDir::new().unwrap();
        let store = FsCheckpointStore::new(checkpoints.path());
        let workspace = workspace_with_file("x");

        let result = store.rollback(Uuid::new_v4(), workspace.path()).await;
        assert!(matches!(result, Err(CheckpointError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_workspace_rejected() {
        let checkpoints = TempDir::new().unwrap();
        let store = FsCheckpointStore::new(checkpoints.path());

        let result = store
            .create(Path::new("/nonexistent/workspace"), 0.5, 1, false)
            .await;
        assert!(matches!(result, Err(CheckpointError::MissingWorkspace(_))));
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_and_best() {
        let checkpoints = TempDir::new().unwrap();
        let store = FsCheckpointStore::new(checkpoints.path());
        let workspace = workspace_with_file("x");

        let best = store.create(workspace.path(), 0.9, 1, true).await.unwrap();
        for i in 2..=5 {
            store
                .create(workspace.path(), 0.1, i, false)
                .await
                .unwrap();
        }

        store.cleanup(2).await.unwrap();

        let history = store.history().await;
        // Best survives no matter its age, plus the two most recent.
        assert!(history.iter().any(|m| m.id == best));
        assert_eq!(history.len(), 3);
    }
}
