// Shared helpers for integration tests.
//
// Provides an isolated home + project directory pair backed by a temporary
// directory, thin wrappers around the engine entry points, and a tree
// snapshot helper for before/after comparisons.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use skill_deploy::commands::{
    InstallOptions, InstallResult, UninstallOptions, UninstallResult, install, uninstall,
};
use skill_deploy::error::DeployError;
use skill_deploy::logging::BufferedLog;
use skill_deploy::scope::{Paths, Scope};
use skill_deploy::sources::SourceSet;

/// An isolated home and project directory backed by a [`tempfile::TempDir`].
///
/// Everything is deleted when the context is dropped.
pub struct IntegrationTestContext {
    /// Temporary directory holding `home/` and `project/`.
    pub dir: tempfile::TempDir,
    /// Paths handed to the engine.
    pub paths: Paths,
    /// Captured engine output.
    pub log: BufferedLog,
}

impl IntegrationTestContext {
    /// Create empty `home/` and `project/` directories.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let home = dir.path().join("home");
        let project = dir.path().join("project");
        std::fs::create_dir_all(&home).expect("create home dir");
        std::fs::create_dir_all(&project).expect("create project dir");
        Self {
            paths: Paths::new(home, project),
            dir,
            log: BufferedLog::new(),
        }
    }

    /// The fake home directory.
    pub fn home(&self) -> &Path {
        &self.paths.home
    }

    /// The fake project directory (current working directory).
    pub fn project(&self) -> &Path {
        &self.paths.cwd
    }

    /// Default root for `adapter` at `scope`.
    pub fn root(&self, adapter: &str, scope: Scope) -> PathBuf {
        let dir = format!(".{adapter}");
        match scope {
            Scope::Global => self.home().join(dir),
            Scope::Local => self.project().join(dir),
        }
    }

    /// Install the bundled sources with default options.
    pub fn install(&self, adapter: &str, scope: Scope) -> Result<InstallResult, DeployError> {
        self.install_with(adapter, scope, &InstallOptions::default())
    }

    /// Install the bundled sources with explicit options.
    pub fn install_with(
        &self,
        adapter: &str,
        scope: Scope,
        options: &InstallOptions,
    ) -> Result<InstallResult, DeployError> {
        install(
            adapter,
            scope,
            options,
            &self.paths,
            &SourceSet::bundled(),
            &self.log,
        )
    }

    /// Uninstall with default options.
    pub fn uninstall(&self, adapter: &str, scope: Scope) -> Result<UninstallResult, DeployError> {
        self.uninstall_with(adapter, scope, &UninstallOptions::default())
    }

    /// Uninstall with explicit options.
    pub fn uninstall_with(
        &self,
        adapter: &str,
        scope: Scope,
        options: &UninstallOptions,
    ) -> Result<UninstallResult, DeployError> {
        uninstall(adapter, scope, options, &self.paths, &self.log)
    }

    /// Warnings logged so far.
    pub fn warnings(&self) -> Vec<String> {
        self.log.warnings()
    }
}

/// Every entry below `root` keyed by `/`-separated relative path. Files map
/// to their content, directories to `"<dir>"`. A missing root is empty.
pub fn snapshot_tree(root: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    walk(root, "", &mut out);
    out
}

fn walk(dir: &Path, prefix: &str, out: &mut BTreeMap<String, String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let entry = entry.expect("read dir entry");
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            out.insert(key.clone(), "<dir>".to_string());
            walk(&path, &key, out);
        } else {
            let content = std::fs::read(&path).expect("read file");
            out.insert(key, String::from_utf8_lossy(&content).into_owned());
        }
    }
}

/// Read a file to a string.
pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read file")
}
