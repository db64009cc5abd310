//! Logging bootstrap and the append-only iteration log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::models::{IterationRecord, LoggingConfig};
use crate::domain::ports::IterationSink;

/// File name of the per-iteration JSONL audit log.
pub const ITERATION_LOG_FILE: &str = "iterations.jsonl";

/// Initialize tracing: a stderr layer in the configured format plus a daily
/// rotated file under `log_dir`. The returned guard must stay alive for the
/// duration of the process or buffered file output is lost.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cogpid={}", config.level)));

    let file_appender = tracing_appender::rolling::daily(log_dir, "cogpid.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}

/// [`IterationSink`] appending one JSON line per iteration.
///
/// Recording is best-effort: write failures are logged and swallowed so the
/// audit trail can never take the control loop down.
pub struct JsonlIterationLog {
    file: Mutex<File>,
}

impl JsonlIterationLog {
    /// Open (or create) the iteration log under `log_dir`.
    pub fn open(log_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
        let path = log_dir.join(ITERATION_LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open iteration log {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl IterationSink for JsonlIterationLog {
    fn record(&self, record: &IterationRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "iteration record not serializable");
                return;
            }
        };
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{line}") {
            error!(error = %e, "iteration record write failed");
        }
    }
}
