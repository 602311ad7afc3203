//! Managed file resource: a destination file with known desired content.
use std::io;
use std::path::PathBuf;

use super::helpers::fs::{sha256_hex, write_atomic};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A file the installer owns, written atomically and only when it differs.
#[derive(Debug, Clone)]
pub struct FileResource {
    /// Absolute destination path.
    pub path: PathBuf,
    /// Desired file content.
    pub content: String,
}

impl FileResource {
    /// Create a new file resource.
    #[must_use]
    pub const fn new(path: PathBuf, content: String) -> Self {
        Self { path, content }
    }

    /// Create a resource used only for removal.
    #[must_use]
    pub const fn at(path: PathBuf) -> Self {
        Self::new(path, String::new())
    }

    /// Fingerprint of the desired content.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        sha256_hex(self.content.as_bytes())
    }
}

impl Applicable for FileResource {
    type Error = io::Error;

    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> io::Result<ResourceChange> {
        match self.current_state()? {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Invalid { reason } => {
                Err(io::Error::new(io::ErrorKind::IsADirectory, reason))
            }
            ResourceState::Missing | ResourceState::Incorrect { .. } => {
                write_atomic(&self.path, self.content.as_bytes())?;
                Ok(ResourceChange::Applied)
            }
        }
    }

    fn remove(&self) -> io::Result<ResourceChange> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(ResourceChange::Applied),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ResourceChange::AlreadyCorrect),
            Err(e) => Err(e),
        }
    }
}

impl Resource for FileResource {
    fn current_state(&self) -> io::Result<ResourceState> {
        if self.path.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("destination is a directory: {}", self.path.display()),
            });
        }
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes == self.content.as_bytes() => Ok(ResourceState::Correct),
            Ok(bytes) => Ok(ResourceState::Incorrect {
                current: format!("sha256:{}", sha256_hex(&bytes)),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ResourceState::Missing),
            Err(e) => Err(e),
        }
    }
}
