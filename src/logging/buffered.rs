//! In-memory logger that records messages instead of printing them.
use std::sync::Mutex;

use super::types::{Level, Log, LogEntry};

/// Implement the methods of [`Log`] by buffering each message into
/// `self.entries` with the corresponding [`Level`].
macro_rules! buffer_log_methods {
    ($($method:ident => $level:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.push(Level::$level, msg);
            }
        )+
    };
}

/// Logger that captures messages for later inspection.
///
/// Library callers that want to present engine output themselves (and the
/// integration tests) use this instead of the console [`Logger`](super::Logger).
#[derive(Debug, Default)]
pub struct BufferedLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferedLog {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, level: Level, msg: &str) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(LogEntry {
                level,
                message: msg.to_string(),
            });
        }
    }

    /// All recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Messages recorded at `level`.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Recorded warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.messages(Level::Warn)
    }
}

impl Log for BufferedLog {
    buffer_log_methods!(
        stage => Stage,
        info => Info,
        debug => Debug,
        warn => Warn,
        error => Error,
    );
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let log = BufferedLog::new();
        log.stage("Installing");
        log.info("wrote a");
        log.warn("careful");
        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, Level::Stage);
        assert_eq!(entries[2].message, "careful");
    }

    #[test]
    fn warnings_filters_by_level() {
        let log = BufferedLog::new();
        log.info("a");
        log.warn("b");
        log.debug("c");
        log.warn("d");
        assert_eq!(log.warnings(), vec!["b", "d"]);
    }

    #[test]
    fn messages_filters_errors() {
        let log = BufferedLog::new();
        log.error("broken");
        log.warn("careful");
        assert_eq!(log.messages(Level::Error), vec!["broken"]);
    }
}
