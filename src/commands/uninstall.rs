//! Uninstall command: remove exactly what the manifest says an adapter owns.
use std::path::PathBuf;

use super::Deployment;
use crate::adapters;
use crate::error::DeployError;
use crate::logging::Log;
use crate::manifest::EntryKind;
use crate::resources::helpers::fs::is_empty_dir;
use crate::resources::stanza::ConfigDocument;
use crate::scope::{Paths, Scope};

/// Options for [`uninstall`].
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Explicit destination root; must match the one used at install time.
    pub config_dir: Option<PathBuf>,
}

/// What an uninstall did.
#[derive(Debug, Clone)]
pub struct UninstallResult {
    /// Adapter that was uninstalled.
    pub adapter: &'static str,
    /// Scope that was uninstalled.
    pub scope: Scope,
    /// Resolved destination root.
    pub root: PathBuf,
    /// Tracked files deleted from disk.
    pub files_removed: usize,
    /// Config files deleted because the install created them and nothing
    /// else was left in them.
    pub config_files_removed: usize,
    /// Stanzas removed from the config file.
    pub stanzas_removed: usize,
    /// Directories deleted from disk.
    pub directories_removed: usize,
    /// Manifest file location.
    pub manifest_path: PathBuf,
    /// The manifest became empty and was deleted.
    pub manifest_deleted: bool,
}

/// Remove everything the manifest attributes to `adapter` at `scope`.
///
/// Entries owned by other adapters are left alone, directories still in use
/// by them are handed over, and an adapter that was never installed is a
/// no-op that creates nothing.
///
/// # Errors
///
/// Returns a [`DeployError`] if the adapter is unknown, the manifest is
/// corrupt, a tracked file cannot be removed, or the config file cannot be
/// edited.
pub fn uninstall(
    adapter: &str,
    scope: Scope,
    options: &UninstallOptions,
    paths: &Paths,
    log: &dyn Log,
) -> Result<UninstallResult, DeployError> {
    let adapter = adapters::lookup(adapter)?;
    let mut deployment =
        Deployment::open(adapter, scope, options.config_dir.as_deref(), paths, log)?;
    log.stage(&format!(
        "Uninstalling {} ({scope})",
        adapter.display_name()
    ));
    log.info(&format!("from {}", deployment.target.root.display()));

    let mut result = UninstallResult {
        adapter: adapter.name(),
        scope,
        root: deployment.target.root.clone(),
        files_removed: 0,
        config_files_removed: 0,
        stanzas_removed: 0,
        directories_removed: 0,
        manifest_path: deployment.store.path(),
        manifest_deleted: false,
    };
    if !result.manifest_path.exists() {
        log.info("nothing installed here");
        return Ok(result);
    }

    let outcome = deployment.uninstall_all(&mut result);
    deployment.finish(outcome)?;

    result.manifest_deleted = !result.manifest_path.exists();
    let root = &deployment.target.root;
    if result.manifest_deleted && deployment.manifest.root_created && is_empty_dir(root) {
        std::fs::remove_dir(root).map_err(|e| deployment.remove_error(root, e))?;
        result.directories_removed += 1;
    }
    Ok(result)
}

impl Deployment<'_> {
    fn uninstall_all(&mut self, result: &mut UninstallResult) -> Result<(), DeployError> {
        let owner = self.owner();
        if self.manifest.paths_owned_by(owner, EntryKind::File).is_empty()
            && self.manifest.registrations_of(owner).is_empty()
        {
            self.log
                .info(&format!("{owner} has nothing recorded here"));
        }

        for key in self.manifest.paths_owned_by(owner, EntryKind::File) {
            if self.remove_tracked_file(&key)? {
                result.files_removed += 1;
            }
        }
        for registration in self.manifest.registrations_of(owner) {
            if self.remove_registration(&registration)? {
                result.stanzas_removed += 1;
            }
        }
        result.config_files_removed += self.release_config_files()?;
        result.directories_removed += self.release_directories()?;
        Ok(())
    }

    /// Forget config file entries owned by this adapter, deleting a file the
    /// install created once nothing is left in it. Returns the number of
    /// files deleted.
    fn release_config_files(&mut self) -> Result<usize, DeployError> {
        let owner = self.owner();
        let format = self.target.adapter.config_file().format;
        let mut removed = 0;
        for key in self.manifest.paths_owned_by(owner, EntryKind::Config) {
            let heir = self
                .manifest
                .registrations
                .iter()
                .find(|r| r.config == key)
                .map(|r| r.owner.clone());
            if let Some(heir) = heir {
                if let Some(entry) = self.manifest.files.get_mut(&key) {
                    entry.owner = heir;
                }
                continue;
            }

            let created = self.manifest.get(&key).is_some_and(|e| e.created);
            let path = self.path_of(&key);
            if created && path.is_file() {
                let doc = ConfigDocument::load(&path, format)
                    .map_err(|e| self.registration_error(&path, e))?;
                if doc.is_empty() {
                    std::fs::remove_file(&path).map_err(|e| self.remove_error(&path, e))?;
                    self.log.info(&format!("removed {key}"));
                    removed += 1;
                } else {
                    self.log
                        .debug(&format!("{key} holds other settings; leaving it in place"));
                }
            }
            self.manifest.forget_file(&key);
        }
        Ok(removed)
    }
}
