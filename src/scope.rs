//! Install scope and destination root resolution.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapters::{self, Adapter};
use crate::error::DeployError;

/// Where an install lands: user-wide or project-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Under the invoking user's home/config directory.
    Global,
    /// Under the current working directory.
    Local,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// Snapshot of the process environment the engine resolves paths against.
///
/// Captured once by the binary via [`Paths::from_env`]; tests construct it
/// directly with temporary directories.
#[derive(Debug, Clone)]
pub struct Paths {
    /// The user's home directory.
    pub home: PathBuf,
    /// The current working directory (project root for local installs).
    pub cwd: PathBuf,
    /// Per-adapter global root overrides keyed by adapter name
    /// (e.g. from `CODEX_HOME`).
    pub global_overrides: HashMap<String, PathBuf>,
}

impl Paths {
    /// Build paths from explicit home and working directories, with no
    /// environment overrides.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
            global_overrides: HashMap::new(),
        }
    }

    /// Capture `HOME`/`USERPROFILE`, the working directory, and each
    /// adapter's home override variable.
    ///
    /// # Errors
    ///
    /// Returns an error if neither home variable is set or the working
    /// directory cannot be determined.
    pub fn from_env() -> Result<Self, DeployError> {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| DeployError::Io {
                path: PathBuf::from("~"),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "neither HOME nor USERPROFILE is set",
                ),
            })?;
        let cwd = std::env::current_dir().map_err(|source| DeployError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

        let mut paths = Self::new(home, cwd);
        for adapter in adapters::all() {
            if let Some(var) = adapter.home_env_var()
                && let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty())
            {
                paths
                    .global_overrides
                    .insert(adapter.name().to_string(), PathBuf::from(value));
            }
        }
        Ok(paths)
    }

    /// Set a global root override for `adapter`.
    #[must_use]
    pub fn with_global_override(mut self, adapter: &str, root: impl Into<PathBuf>) -> Self {
        self.global_overrides
            .insert(adapter.to_string(), root.into());
        self
    }

    /// Expand a user-supplied path: `~/` against home, relative against cwd.
    #[must_use]
    pub fn expand(&self, path: &Path) -> PathBuf {
        if let Ok(rest) = path.strip_prefix("~") {
            return self.home.join(rest);
        }
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// A fully resolved destination: adapter, scope, root directory, and the
/// prefix used when rewriting home-path references in content.
#[derive(Debug, Clone)]
pub struct Target {
    /// Active adapter.
    pub adapter: &'static dyn Adapter,
    /// Requested scope.
    pub scope: Scope,
    /// Destination root directory.
    pub root: PathBuf,
    /// How installed content should refer to the root, always ending in `/`.
    pub path_prefix: String,
}

impl Target {
    /// Resolve the destination root for `adapter` at `scope`.
    ///
    /// An explicit `config_dir` wins over everything; otherwise global scope
    /// uses the adapter's environment override or `~/<dir>`, and local scope
    /// uses `<cwd>/<dir>`.
    #[must_use]
    pub fn resolve(
        adapter: &'static dyn Adapter,
        scope: Scope,
        config_dir: Option<&Path>,
        paths: &Paths,
    ) -> Self {
        let dir = adapter.config_dir_name();
        let default_root = match scope {
            Scope::Global => paths.home.join(dir),
            Scope::Local => paths.cwd.join(dir),
        };
        let root = match (config_dir, scope) {
            (Some(explicit), _) => paths.expand(explicit),
            (None, Scope::Global) => paths
                .global_overrides
                .get(adapter.name())
                .map_or_else(|| default_root.clone(), |p| paths.expand(p)),
            (None, Scope::Local) => default_root.clone(),
        };

        let path_prefix = if root == default_root {
            match scope {
                Scope::Global => format!("~/{dir}/"),
                Scope::Local => format!("./{dir}/"),
            }
        } else {
            let display = root.to_string_lossy().replace('\\', "/");
            format!("{}/", display.trim_end_matches('/'))
        };

        Self {
            adapter,
            scope,
            root,
            path_prefix,
        }
    }
}
