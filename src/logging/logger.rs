//! Console logger backed by `tracing`, with a warning counter for the summary.
use std::sync::atomic::{AtomicUsize, Ordering};

use super::STAGE_TARGET;
use super::types::Log;

/// Implement the methods of [`Log`] by delegating to inherent methods of the
/// same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured console logger.
///
/// Messages go through `tracing` so the formatter installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) decides how they
/// look and which stream they land on.
#[derive(Debug, Default)]
pub struct Logger {
    warnings: AtomicUsize,
    errors: AtomicUsize,
}

impl Logger {
    /// Create a new logger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            warnings: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        }
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
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

    /// Number of warnings logged so far.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    /// Number of errors logged so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Print the closing summary line, noting any warnings or errors logged.
    pub fn print_summary(&self, outcome: &str) {
        self.info(&summary_line(
            outcome,
            self.warning_count(),
            self.error_count(),
        ));
    }
}

fn counted(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn summary_line(outcome: &str, warnings: usize, errors: usize) -> String {
    let mut notes = Vec::new();
    if warnings > 0 {
        notes.push(counted(warnings, "warning"));
    }
    if errors > 0 {
        notes.push(counted(errors, "error"));
    }
    if notes.is_empty() {
        outcome.to_string()
    } else {
        format!("{outcome} \x1b[33m({})\x1b[0m", notes.join(", "))
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);
}
