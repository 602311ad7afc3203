//! Persistent ownership record of everything an install created.
//!
//! One manifest lives at the root of each resolved destination. Every entry
//! carries an explicit `owner` (the adapter name) so uninstall never has to
//! infer ownership from path shapes. Maps are ordered and the document is
//! pretty-printed, which makes a load followed by a save byte-stable.
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DeployError;
use crate::resources::helpers::fs::write_atomic;
use crate::scope::Scope;

/// File name of the manifest at the scope root.
pub const MANIFEST_FILE: &str = "skill-deploy-manifest.json";

/// Highest manifest format version this build understands.
pub const MANIFEST_VERSION: u32 = 1;

/// What a manifest entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// An installed file.
    File,
    /// A directory created by an install.
    Directory,
    /// The target tool's shared config file.
    Config,
}

/// Metadata for one tracked path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Adapter that owns this path.
    pub owner: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Source identifier that produced the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// SHA-256 of the content as installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Config file did not exist before the first install.
    #[serde(default, skip_serializing_if = "is_false")]
    pub created: bool,
    /// Where a pre-existing foreign file was moved before overwriting it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl ManifestEntry {
    /// Entry for an installed file.
    #[must_use]
    pub fn file(owner: &str, source: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            owner: owner.to_string(),
            kind: EntryKind::File,
            source: Some(source.into()),
            sha256: Some(sha256.into()),
            created: false,
            backup: None,
        }
    }

    /// Entry for a directory created by an install.
    #[must_use]
    pub fn directory(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            kind: EntryKind::Directory,
            source: None,
            sha256: None,
            created: false,
            backup: None,
        }
    }

    /// Entry for the adapter's config file.
    #[must_use]
    pub fn config(owner: &str, created: bool) -> Self {
        Self {
            owner: owner.to_string(),
            kind: EntryKind::Config,
            source: None,
            sha256: None,
            created,
            backup: None,
        }
    }

    /// Attach a backup location.
    #[must_use]
    pub fn with_backup(mut self, backup: Option<String>) -> Self {
        self.backup = backup;
        self
    }
}

/// A config stanza written on behalf of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistrationEntry {
    /// Adapter that owns the stanza.
    pub owner: String,
    /// Config file path relative to the root.
    pub config: String,
    /// Dotted stanza name.
    pub stanza: String,
}

/// In-memory manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version.
    pub version: u32,
    /// Scope the manifest was written for.
    pub scope: Scope,
    /// Tracked paths keyed by `/`-separated path relative to the root.
    #[serde(default)]
    pub files: BTreeMap<String, ManifestEntry>,
    /// Tracked config stanzas.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub registrations: BTreeSet<RegistrationEntry>,
    /// The destination root itself did not exist before the first install.
    #[serde(default, skip_serializing_if = "is_false")]
    pub root_created: bool,
}

impl Manifest {
    /// Create an empty manifest for `scope`.
    #[must_use]
    pub const fn new(scope: Scope) -> Self {
        Self {
            version: MANIFEST_VERSION,
            scope,
            files: BTreeMap::new(),
            registrations: BTreeSet::new(),
            root_created: false,
        }
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.registrations.is_empty()
    }

    /// Track `path`, replacing any previous entry (the last installer owns it).
    pub fn record_file(&mut self, path: impl Into<String>, entry: ManifestEntry) {
        self.files.insert(path.into(), entry);
    }

    /// Stop tracking `path`, returning its entry.
    pub fn forget_file(&mut self, path: &str) -> Option<ManifestEntry> {
        self.files.remove(path)
    }

    /// Entry for `path`, if tracked.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.files.get(path)
    }

    /// Paths owned by `owner` with the given kind, in key order.
    #[must_use]
    pub fn paths_owned_by(&self, owner: &str, kind: EntryKind) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, e)| e.owner == owner && e.kind == kind)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Owners of every entry below directory `dir`.
    #[must_use]
    pub fn owners_below(&self, dir: &str) -> BTreeSet<String> {
        let prefix = format!("{dir}/");
        self.files
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, e)| e.owner.clone())
            .collect()
    }

    /// Track a config stanza.
    pub fn record_registration(&mut self, owner: &str, config: &str, stanza: &str) {
        self.registrations.insert(RegistrationEntry {
            owner: owner.to_string(),
            config: config.to_string(),
            stanza: stanza.to_string(),
        });
    }

    /// Stop tracking a config stanza.
    pub fn forget_registration(&mut self, entry: &RegistrationEntry) -> bool {
        self.registrations.remove(entry)
    }

    /// Stanzas owned by `owner`.
    #[must_use]
    pub fn registrations_of(&self, owner: &str) -> Vec<RegistrationEntry> {
        self.registrations
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect()
    }

    /// Serialize to the on-disk form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    fn validate(&self, expected: Scope) -> Result<(), String> {
        if self.version > MANIFEST_VERSION {
            return Err(format!(
                "unsupported version {} (this build reads up to {MANIFEST_VERSION})",
                self.version
            ));
        }
        if self.scope != expected {
            return Err(format!(
                "written for {} scope, but {expected} scope was requested",
                self.scope
            ));
        }
        let keys = self
            .files
            .keys()
            .chain(self.files.values().filter_map(|e| e.backup.as_ref()))
            .chain(self.registrations.iter().map(|r| &r.config));
        for key in keys {
            if !is_contained(key) {
                return Err(format!("entry '{key}' escapes the destination root"));
            }
        }
        Ok(())
    }
}

/// Whether a manifest key stays inside the root it is relative to.
fn is_contained(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Loads and saves the manifest of one destination root.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    scope: Scope,
    root: PathBuf,
}

impl ManifestStore {
    /// Create a store for `root` at `scope`.
    #[must_use]
    pub fn new(scope: Scope, root: impl Into<PathBuf>) -> Self {
        Self {
            scope,
            root: root.into(),
        }
    }

    /// Absolute path of the manifest file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Load the manifest, or an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::ManifestCorrupt`] if the file cannot be parsed,
    /// has a newer version, belongs to the other scope, or tracks paths
    /// outside the root. Other read failures are [`DeployError::Io`].
    pub fn load(&self) -> Result<Manifest, DeployError> {
        let path = self.path();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Manifest::new(self.scope)),
            Err(source) => return Err(DeployError::Io { path, source }),
        };
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|e| DeployError::ManifestCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        manifest
            .validate(self.scope)
            .map_err(|reason| DeployError::ManifestCorrupt { path, reason })?;
        Ok(manifest)
    }

    /// Persist `manifest`. An empty manifest deletes the file.
    ///
    /// Nothing is written when the file already holds an equal manifest.
    /// Returns whether the file on disk changed.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Io`] if the file cannot be written or removed.
    pub fn save(&self, manifest: &Manifest) -> Result<bool, DeployError> {
        if manifest.is_empty() {
            return self.delete();
        }
        let path = self.path();
        if let Ok(existing) = std::fs::read_to_string(&path)
            && serde_json::from_str::<Manifest>(&existing).is_ok_and(|m| &m == manifest)
        {
            return Ok(false);
        }
        let io_err = |source| DeployError::Io {
            path: path.clone(),
            source,
        };
        let text = manifest.to_json().map_err(|e| io_err(e.into()))?;
        std::fs::create_dir_all(&self.root).map_err(|source| DeployError::Io {
            path: self.root.clone(),
            source,
        })?;
        write_atomic(&path, text.as_bytes()).map_err(io_err)?;
        Ok(true)
    }

    /// Delete the manifest file. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Io`] if the file exists but cannot be removed.
    pub fn delete(&self) -> Result<bool, DeployError> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DeployError::Io { path, source }),
        }
    }
}
