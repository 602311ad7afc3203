//! Logging infrastructure for structured console output.

mod buffered;
mod logger;
mod subscriber;
mod types;

pub use buffered::BufferedLog;
pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Level, Log, LogEntry};

/// Target used for stage header events.
pub(crate) const STAGE_TARGET: &str = "skill_deploy::stage";
