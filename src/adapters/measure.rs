//! Composite process variable measurement.
//!
//! The PV is a weighted sum of four best-effort signals: token overlap
//! between the goal text and the workspace, test pass rate, an optional
//! external lint command, and goal keyword coverage. Only the numeric
//! contract matters to the loop: the result is always clamped to [0, 1].

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::task;
use tracing::{debug, warn};

use crate::domain::error::MeasureError;
use crate::domain::models::{MetricsConfig, TestResults};
use crate::domain::ports::ProcessMeasure;

/// Per-file read cap; measurement never needs whole large files.
const MAX_FILE_BYTES: u64 = 65_536;
/// Cap on files sampled per measurement.
const MAX_FILES: usize = 200;

/// [`ProcessMeasure`] combining similarity, tests, lint and coverage.
pub struct CompositeMeasure {
    weights: MetricsConfig,
}

impl CompositeMeasure {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            weights: config.clone(),
        }
    }

    fn weight(&self, key: &str) -> f64 {
        self.weights.weights.get(key).copied().unwrap_or(0.0)
    }

    async fn lint_score(&self, workspace: &Path) -> Result<f64, MeasureError> {
        let Some(command) = &self.weights.lint_command else {
            return Ok(1.0);
        };

        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(workspace)
            .status()
            .await
            .map_err(|e| MeasureError::Lint(e.to_string()))?;

        Ok(if status.success() { 1.0 } else { 0.0 })
    }
}

#[async_trait]
impl ProcessMeasure for CompositeMeasure {
    async fn measure(
        &self,
        setpoint: &str,
        workspace: &Path,
        test_results: &TestResults,
    ) -> Result<f64, MeasureError> {
        let setpoint_owned = setpoint.to_string();
        let root = workspace.to_path_buf();
        let (similarity, coverage) =
            task::spawn_blocking(move || -> Result<(f64, f64), MeasureError> {
                let corpus = read_workspace_text(&root)?;
                Ok((
                    jaccard_similarity(&setpoint_owned, &corpus),
                    keyword_coverage(&setpoint_owned, &corpus),
                ))
            })
            .await
            .map_err(std::io::Error::other)??;

        let pass_rate = test_results.pass_rate();
        let lint = match self.lint_score(workspace).await {
            Ok(score) => score,
            Err(e) => {
                warn!(error = %e, "lint command unavailable, scoring zero");
                0.0
            }
        };

        let pv = self.weight("similarity") * similarity
            + self.weight("test_pass_rate") * pass_rate
            + self.weight("lint_score") * lint
            + self.weight("req_coverage") * coverage;
        let pv = pv.clamp(0.0, 1.0);

        debug!(similarity, pass_rate, lint, coverage, pv, "PV measured");
        Ok(pv)
    }
}

/// Concatenated text of the workspace's source files, size-capped.
fn read_workspace_text(root: &Path) -> std::io::Result<String> {
    let mut corpus = String::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    let mut files_read = 0;

    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if files_read >= MAX_FILES {
                return Ok(corpus);
            }
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                if name != "target" && name != "node_modules" && name != "__pycache__" {
                    stack.push(path);
                }
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if meta.len() > MAX_FILE_BYTES {
                continue;
            }
            if let Ok(text) = fs::read_to_string(&path) {
                corpus.push_str(&text);
                corpus.push('\n');
                files_read += 1;
            }
        }
    }
    Ok(corpus)
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard index between goal and workspace token sets.
fn jaccard_similarity(setpoint: &str, corpus: &str) -> f64 {
    let a = tokens(setpoint);
    let b = tokens(corpus);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Fraction of significant goal words that appear somewhere in the workspace.
fn keyword_coverage(setpoint: &str, corpus: &str) -> f64 {
    let keywords: Vec<String> = tokens(setpoint)
        .into_iter()
        .filter(|w| w.len() > 4)
        .collect();
    if keywords.is_empty() {
        return 0.0;
    }
    let corpus_tokens = tokens(corpus);
    let covered = keywords
        .iter()
        .filter(|k| corpus_tokens.contains(*k))
        .count();
    covered as f64 / keywords.len() as f64
}
