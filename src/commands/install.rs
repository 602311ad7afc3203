//! Install command: transform, write, register, record.
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use super::{BACKUP_DIR, Deployment};
use crate::adapters::{self, Stanza};
use crate::error::DeployError;
use crate::logging::Log;
use crate::manifest::{EntryKind, ManifestEntry};
use crate::resources::file::FileResource;
use crate::resources::helpers::fs::{ensure_parent_dirs, relative_key};
use crate::resources::stanza::{ConfigDocument, StanzaResource};
use crate::resources::{Applicable, Resource, ResourceChange, ResourceState};
use crate::scope::{Paths, Scope};
use crate::sources::{SourceFile, SourceSet};
use crate::transform::RuleSet;

/// Options for [`install`].
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Explicit destination root, overriding scope resolution.
    pub config_dir: Option<PathBuf>,
    /// Source identifiers to install; empty means all of them.
    pub only: Vec<String>,
}

/// What an install did.
#[derive(Debug, Clone)]
pub struct InstallResult {
    /// Adapter that was installed.
    pub adapter: &'static str,
    /// Scope that was installed.
    pub scope: Scope,
    /// Resolved destination root.
    pub root: PathBuf,
    /// Files whose content was written.
    pub files_written: usize,
    /// Files that already had the right content.
    pub files_unchanged: usize,
    /// Previously installed files removed because no source produces them any more.
    pub files_pruned: usize,
    /// Stanzas inserted or replaced.
    pub stanzas_registered: usize,
    /// Every destination path this install covers.
    pub destinations: BTreeSet<PathBuf>,
    /// Manifest file location.
    pub manifest_path: PathBuf,
    /// Config file that received stanzas, if any.
    pub config_path: Option<PathBuf>,
}

/// Install `sources` for `adapter` at `scope`.
///
/// Unknown adapters, unknown `--only` identifiers, destinations owned by
/// another adapter, broken rewrite rules and an unparsable target config file
/// are all reported before anything is written. A failure halfway still saves
/// the manifest with whatever was written, so a later uninstall can clean it
/// up.
///
/// # Errors
///
/// Returns a [`DeployError`] describing the first failure.
pub fn install(
    adapter: &str,
    scope: Scope,
    options: &InstallOptions,
    paths: &Paths,
    sources: &SourceSet,
    log: &dyn Log,
) -> Result<InstallResult, DeployError> {
    let adapter = adapters::lookup(adapter)?;
    let selected = sources.select(&options.only, adapter.name())?;
    let mut deployment =
        Deployment::open(adapter, scope, options.config_dir.as_deref(), paths, log)?;
    let rules = adapter
        .rewrite_rules(&deployment.target)
        .map_err(|source| DeployError::Transform {
            adapter: adapter.name().to_string(),
            source,
        })?;
    deployment.check_ownership(&selected)?;
    let stanzas = adapter.registrations(&selected, &deployment.target);
    if !stanzas.is_empty() {
        let config = adapter.config_file();
        let config_path = deployment.path_of(config.path);
        ConfigDocument::load(&config_path, config.format)
            .map_err(|e| deployment.registration_error(&config_path, e))?;
    }

    log.stage(&format!(
        "Installing {} for {} ({scope})",
        plural(selected.len(), "file"),
        adapter.display_name()
    ));
    log.info(&format!("into {}", deployment.target.root.display()));
    for rule in rules.rules() {
        log.debug(&format!("rewrite: {}", rule.describe()));
    }
    if deployment.manifest.is_empty() && !deployment.target.root.exists() {
        deployment.manifest.root_created = true;
    }

    let mut result = InstallResult {
        adapter: adapter.name(),
        scope,
        root: deployment.target.root.clone(),
        files_written: 0,
        files_unchanged: 0,
        files_pruned: 0,
        stanzas_registered: 0,
        destinations: BTreeSet::new(),
        manifest_path: deployment.store.path(),
        config_path: None,
    };
    let outcome = deployment.install_all(
        &selected,
        &rules,
        &stanzas,
        options.only.is_empty(),
        &mut result,
    );
    deployment.finish(outcome)?;
    Ok(result)
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

impl Deployment<'_> {
    fn install_all(
        &mut self,
        selected: &[&SourceFile],
        rules: &RuleSet,
        stanzas: &[Stanza],
        prune: bool,
        result: &mut InstallResult,
    ) -> Result<(), DeployError> {
        let mut produced = BTreeSet::new();
        for source in selected {
            let key = self.target.adapter.destination(source);
            let content = rules.apply(&source.content);
            match self.install_file(&key, source, content)? {
                ResourceChange::Applied => result.files_written += 1,
                ResourceChange::AlreadyCorrect => result.files_unchanged += 1,
            }
            result.destinations.insert(self.path_of(&key));
            produced.insert(key);
        }

        if !stanzas.is_empty() {
            result.stanzas_registered = self.register(stanzas)?;
            result.config_path = Some(self.path_of(self.target.adapter.config_file().path));
        }

        if prune {
            result.files_pruned = self.prune_orphans(&produced, stanzas)?;
        }
        Ok(())
    }

    /// Refuse to install over a path another adapter owns at this root.
    ///
    /// Two adapters sharing a root may install side by side, but never into
    /// the same file: the later one would replace the earlier one's content
    /// and take it away again on uninstall.
    fn check_ownership(&self, selected: &[&SourceFile]) -> Result<(), DeployError> {
        let owner = self.owner();
        for source in selected {
            let key = self.target.adapter.destination(source);
            if let Some(entry) = self.manifest.get(&key)
                && entry.owner != owner
            {
                return Err(self.write_error(
                    &self.path_of(&key),
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("already installed by adapter '{}'", entry.owner),
                    ),
                ));
            }
        }
        Ok(())
    }

    fn install_file(
        &mut self,
        key: &str,
        source: &SourceFile,
        content: String,
    ) -> Result<ResourceChange, DeployError> {
        let owner = self.owner();
        let resource = FileResource::new(self.path_of(key), content);
        let path = resource.path.clone();
        let state = resource
            .current_state()
            .map_err(|e| self.write_error(&path, e))?;
        let tracked = self
            .manifest
            .get(key)
            .filter(|e| e.kind == EntryKind::File)
            .cloned();
        let mut backup = tracked.as_ref().and_then(|e| e.backup.clone());
        let mut fresh_backup = None;

        match (state, tracked.is_some()) {
            (ResourceState::Invalid { reason }, _) => {
                return Err(
                    self.write_error(&path, io::Error::new(io::ErrorKind::IsADirectory, reason))
                );
            }
            (ResourceState::Missing, _) | (ResourceState::Correct, true) => {}
            (ResourceState::Correct | ResourceState::Incorrect { .. }, false) => {
                let backup_key = self.back_up_foreign(key)?;
                fresh_backup = Some(backup_key.clone());
                backup = Some(backup_key);
            }
            (ResourceState::Incorrect { .. }, true) => {
                if let Some(current) = self.local_modification(key) {
                    self.preserve_local_patch(key, &current)?;
                }
            }
        }

        let mut created = Vec::new();
        let ensured = ensure_parent_dirs(&path, &self.target.root, &mut created);
        for dir in created {
            if let Some(dir_key) = relative_key(&self.target.root, &dir) {
                self.manifest
                    .record_file(dir_key, ManifestEntry::directory(owner));
            }
        }
        ensured.map_err(|e| self.write_error(&path, e))?;

        let change = match resource.apply() {
            Ok(change) => change,
            Err(e) => {
                if let Some(backup_key) = fresh_backup
                    && let Err(restore_err) = self.restore_backup(key, &backup_key)
                {
                    self.log.error(&format!("{restore_err}"));
                }
                return Err(self.write_error(&path, e));
            }
        };

        self.manifest.record_file(
            key,
            ManifestEntry::file(owner, source.id(), resource.fingerprint()).with_backup(backup),
        );
        match change {
            ResourceChange::Applied => self.log.info(&format!("wrote {key}")),
            ResourceChange::AlreadyCorrect => self
                .log
                .debug(&format!("unchanged {}", resource.description())),
        }
        Ok(change)
    }

    /// Move an untracked file out of the way so uninstall can put it back.
    fn back_up_foreign(&self, key: &str) -> Result<String, DeployError> {
        let backup_key = format!("{BACKUP_DIR}/{key}");
        let backup = self.path_of(&backup_key);
        if let Some(parent) = backup.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(parent, e))?;
        }
        std::fs::rename(self.path_of(key), &backup).map_err(|e| self.write_error(&backup, e))?;
        self.log
            .info(&format!("moved pre-existing {key} to {backup_key}"));
        Ok(backup_key)
    }

    fn register(&mut self, stanzas: &[Stanza]) -> Result<usize, DeployError> {
        let owner = self.owner();
        let config = self.target.adapter.config_file();
        let path = self.path_of(config.path);
        let existed = path.exists();
        let mut changed = 0;
        for stanza in stanzas {
            let resource = StanzaResource::new(path.clone(), config.format, stanza.clone());
            let change = resource
                .apply()
                .map_err(|e| self.registration_error(&path, e))?;
            self.manifest
                .record_registration(owner, config.path, &stanza.name);
            if change == ResourceChange::Applied {
                changed += 1;
                self.log
                    .info(&format!("registered [{}] in {}", stanza.name, config.path));
            } else {
                self.log
                    .debug(&format!("{} already registered", resource.description()));
            }
        }
        if self.manifest.get(config.path).is_none() {
            self.manifest
                .record_file(config.path, ManifestEntry::config(owner, !existed));
        }
        Ok(changed)
    }

    /// Remove files and stanzas this adapter installed before but no longer
    /// produces.
    fn prune_orphans(
        &mut self,
        produced: &BTreeSet<String>,
        stanzas: &[Stanza],
    ) -> Result<usize, DeployError> {
        let owner = self.owner();
        let mut pruned = 0;
        for key in self.manifest.paths_owned_by(owner, EntryKind::File) {
            if produced.contains(&key) {
                continue;
            }
            self.log
                .debug(&format!("{key} is no longer provided by any source"));
            if self.remove_tracked_file(&key)? {
                pruned += 1;
            }
        }
        let wanted: BTreeSet<&str> = stanzas.iter().map(|s| s.name.as_str()).collect();
        for registration in self.manifest.registrations_of(owner) {
            if !wanted.contains(registration.stanza.as_str()) {
                self.remove_registration(&registration)?;
            }
        }
        self.release_directories()?;
        Ok(pruned)
    }
}
