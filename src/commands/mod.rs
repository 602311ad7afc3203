//! Install and uninstall orchestration.
//!
//! Both commands open a [`Deployment`]: the resolved target, its manifest
//! store and the loaded manifest. Every mutation goes through it so the
//! manifest always reflects what is actually on disk, and [`Deployment::finish`]
//! persists it even when a step fails halfway.
pub mod install;
pub mod uninstall;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::adapters::{Adapter, Stanza};
use crate::cli::Cli;
use crate::error::{DeployError, RegistrationError};
use crate::logging::{Log, Logger};
use crate::manifest::{EntryKind, Manifest, ManifestStore, RegistrationEntry};
use crate::resources::file::FileResource;
use crate::resources::helpers::fs::{
    is_empty_dir, join_key, prune_empty_dirs, sha256_hex, write_atomic,
};
use crate::resources::stanza::StanzaResource;
use crate::resources::{Applicable, ResourceChange};
use crate::scope::{Paths, Scope, Target};
use crate::sources::SourceSet;

pub use install::{InstallOptions, InstallResult, install};
pub use uninstall::{UninstallOptions, UninstallResult, uninstall};

/// Where foreign files are moved before being overwritten.
pub const BACKUP_DIR: &str = ".skill-deploy-backup";

/// Where locally modified copies of tracked files are preserved.
pub const PATCHES_DIR: &str = "skill-deploy-local-patches";

/// Run the command selected on the command line.
///
/// # Errors
///
/// Returns an error if the environment cannot be captured, the source
/// templates cannot be read, or the install / uninstall fails.
pub fn run(cli: &Cli, log: &Logger) -> Result<()> {
    let paths = Paths::from_env()?;
    let scope = cli.scope();
    let adapter = cli.adapter_name();

    if cli.uninstall {
        let options = UninstallOptions {
            config_dir: cli.config_dir.clone(),
        };
        let result = uninstall(adapter, scope, &options, &paths, log)?;
        log.stage("Summary");
        log.print_summary(&format!(
            "removed {} file(s) and {} stanza(s) from {}",
            result.files_removed,
            result.stanzas_removed,
            result.root.display()
        ));
        return Ok(());
    }

    let sources = match &cli.source {
        Some(dir) => SourceSet::from_dir(&paths.expand(dir))?,
        None => SourceSet::bundled(),
    };
    let options = InstallOptions {
        config_dir: cli.config_dir.clone(),
        only: cli.only.clone(),
    };
    let result = install(adapter, scope, &options, &paths, &sources, log)?;
    log.stage("Summary");
    log.print_summary(&format!(
        "{} file(s) written, {} unchanged, manifest: {}",
        result.files_written,
        result.files_unchanged,
        result.manifest_path.display()
    ));
    Ok(())
}

/// Shared state of one install or uninstall run.
pub(crate) struct Deployment<'a> {
    pub(crate) target: Target,
    pub(crate) store: ManifestStore,
    pub(crate) manifest: Manifest,
    pub(crate) log: &'a dyn Log,
}

impl<'a> Deployment<'a> {
    /// Resolve the target root and load its manifest.
    pub(crate) fn open(
        adapter: &'static dyn Adapter,
        scope: Scope,
        config_dir: Option<&Path>,
        paths: &Paths,
        log: &'a dyn Log,
    ) -> Result<Self, DeployError> {
        let target = Target::resolve(adapter, scope, config_dir, paths);
        let store = ManifestStore::new(scope, &target.root);
        let manifest = store.load()?;
        log.debug(&format!("root: {}", target.root.display()));
        log.debug(&format!("manifest: {}", store.path().display()));
        Ok(Self {
            target,
            store,
            manifest,
            log,
        })
    }

    pub(crate) fn owner(&self) -> &'static str {
        self.target.adapter.name()
    }

    pub(crate) fn path_of(&self, key: &str) -> PathBuf {
        join_key(&self.target.root, key)
    }

    pub(crate) fn write_error(&self, path: &Path, source: io::Error) -> DeployError {
        DeployError::Write {
            adapter: self.owner().to_string(),
            scope: self.target.scope,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn remove_error(&self, path: &Path, source: io::Error) -> DeployError {
        DeployError::Remove {
            adapter: self.owner().to_string(),
            scope: self.target.scope,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn registration_error(&self, path: &Path, source: RegistrationError) -> DeployError {
        DeployError::ConfigRegistration {
            adapter: self.owner().to_string(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Persist the manifest, then hand back `outcome`.
    ///
    /// Runs on failure too, so partial progress stays recorded. When both the
    /// step and the save fail, the step's error wins.
    pub(crate) fn finish<T>(&self, outcome: Result<T, DeployError>) -> Result<T, DeployError> {
        let saved = self.store.save(&self.manifest);
        match (outcome, saved) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(e)) | (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(save_err)) => {
                self.log
                    .error(&format!("could not record partial progress: {save_err}"));
                Err(e)
            }
        }
    }

    /// Copy a tracked file whose content no longer matches its recorded
    /// fingerprint into the patches directory before it is replaced.
    pub(crate) fn preserve_local_patch(&self, key: &str, current: &[u8]) -> Result<(), DeployError> {
        let patch_key = format!("{PATCHES_DIR}/{key}");
        let patch = self.path_of(&patch_key);
        if let Some(parent) = patch.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(parent, e))?;
        }
        write_atomic(&patch, current).map_err(|e| self.write_error(&patch, e))?;
        self.log.warn(&format!(
            "{key} was modified locally; saved a copy to {patch_key}"
        ));
        Ok(())
    }

    /// Whether the file at `key` has drifted from its recorded fingerprint.
    /// Returns the current bytes when it has.
    pub(crate) fn local_modification(&self, key: &str) -> Option<Vec<u8>> {
        let recorded = self.manifest.get(key)?.sha256.as_deref()?;
        let current = std::fs::read(self.path_of(key)).ok()?;
        (sha256_hex(&current) != recorded).then_some(current)
    }

    /// Remove a tracked file, restore any backup it displaced, and forget it.
    ///
    /// A file already deleted out of band is only warned about. Returns
    /// whether a file was removed from disk.
    pub(crate) fn remove_tracked_file(&mut self, key: &str) -> Result<bool, DeployError> {
        let path = self.path_of(key);
        let backup = self.manifest.get(key).and_then(|e| e.backup.clone());

        let removed = match std::fs::symlink_metadata(&path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.log.warn(&format!(
                    "{key} is recorded in the manifest but was already removed; dropping the entry"
                ));
                false
            }
            Err(e) => return Err(self.remove_error(&path, e)),
            Ok(meta) if meta.is_dir() => {
                return Err(self.remove_error(
                    &path,
                    io::Error::new(
                        io::ErrorKind::IsADirectory,
                        "a directory now occupies a tracked file path",
                    ),
                ));
            }
            Ok(_) => {
                if let Some(current) = self.local_modification(key) {
                    self.preserve_local_patch(key, &current)?;
                }
                let change = FileResource::at(path.clone())
                    .remove()
                    .map_err(|e| self.remove_error(&path, e))?;
                change == ResourceChange::Applied
            }
        };

        if let Some(backup_key) = backup {
            self.restore_backup(key, &backup_key)?;
        }
        self.manifest.forget_file(key);
        if removed {
            self.log.info(&format!("removed {key}"));
        }
        Ok(removed)
    }

    fn restore_backup(&self, key: &str, backup_key: &str) -> Result<(), DeployError> {
        let backup = self.path_of(backup_key);
        if !backup.is_file() {
            self.log
                .warn(&format!("backup {backup_key} for {key} is missing; nothing to restore"));
            return Ok(());
        }
        let path = self.path_of(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(parent, e))?;
        }
        std::fs::rename(&backup, &path).map_err(|e| self.write_error(&path, e))?;
        if let Some(parent) = backup.parent() {
            prune_empty_dirs(parent, &self.target.root);
        }
        self.log.info(&format!("restored original {key}"));
        Ok(())
    }

    /// Remove one tracked stanza from its config file and forget it.
    pub(crate) fn remove_registration(
        &mut self,
        registration: &RegistrationEntry,
    ) -> Result<bool, DeployError> {
        let format = self.target.adapter.config_file().format;
        let path = self.path_of(&registration.config);
        let resource = StanzaResource::new(path.clone(), format, Stanza::new(&registration.stanza));
        let change = resource
            .remove()
            .map_err(|e| self.registration_error(&path, e))?;
        self.manifest.forget_registration(registration);
        let removed = change == ResourceChange::Applied;
        if removed {
            self.log.info(&format!(
                "unregistered [{}] from {}",
                registration.stanza, registration.config
            ));
        }
        Ok(removed)
    }

    /// Let go of directories this adapter created, deepest first.
    ///
    /// A directory still holding this adapter's entries is kept. One that
    /// only holds other adapters' entries is handed over to them. One with
    /// no tracked entries is removed when empty and forgotten either way.
    /// Returns the number of directories removed.
    pub(crate) fn release_directories(&mut self) -> Result<usize, DeployError> {
        let owner = self.owner();
        let mut removed = 0;
        for key in self
            .manifest
            .paths_owned_by(owner, EntryKind::Directory)
            .into_iter()
            .rev()
        {
            let owners = self.manifest.owners_below(&key);
            if owners.contains(owner) {
                continue;
            }
            if let Some(heir) = owners.into_iter().next() {
                self.log
                    .debug(&format!("{key}/ is still used by {heir}; handing it over"));
                if let Some(entry) = self.manifest.files.get_mut(&key) {
                    entry.owner = heir;
                }
                continue;
            }
            let path = self.path_of(&key);
            if is_empty_dir(&path) {
                std::fs::remove_dir(&path).map_err(|e| self.remove_error(&path, e))?;
                removed += 1;
            } else if path.exists() {
                self.log
                    .debug(&format!("{key}/ holds untracked files; leaving it in place"));
            }
            self.manifest.forget_file(&key);
        }
        Ok(removed)
    }
}
