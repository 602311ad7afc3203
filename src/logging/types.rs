//! Core logging types: levels, recorded entries, and the [`Log`] trait.

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Diagnostic detail, hidden on the console unless verbose.
    Debug,
    /// Ordinary progress output.
    Info,
    /// Section header.
    Stage,
    /// Something the user should look at; the run still succeeds.
    Warn,
    /// A failure.
    Error,
}

/// A single recorded log message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Message severity.
    pub level: Level,
    /// Message text.
    pub message: String,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) writes straight to the console through
/// `tracing`; [`BufferedLog`](super::buffered::BufferedLog) keeps messages in
/// memory. Engine code only sees this trait, so it never decides where output
/// goes.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
}
