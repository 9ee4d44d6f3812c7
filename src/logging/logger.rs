//! Console logger facade with dry-run awareness.
use std::path::{Path, PathBuf};

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};

/// Structured logger used by command handlers.
///
/// Every method emits a [`tracing`] event; formatting and the optional log
/// file are handled by the subscriber installed with
/// [`init_subscriber`](super::init_subscriber).
#[derive(Debug, Default)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

#[allow(clippy::unused_self)]
impl Logger {
    /// Create a logger. `log_file` is only remembered for display; the file
    /// itself is written by the subscriber.
    #[must_use]
    pub fn new(log_file: Option<&Path>) -> Self {
        Self {
            log_file: log_file.map(Path::to_path_buf),
        }
    }

    /// Path of the persistent log file, if one was requested.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }
}
