//! Registry of supported target tools.
//!
//! Each [`Adapter`] describes one tool's directory layout, the rewrites its
//! content needs, and how an install registers itself in the tool's own
//! config file. Everything tool-specific lives behind this trait so the
//! installer and uninstaller never branch on tool names.
pub mod claude;
pub mod codex;

use std::fmt;

use crate::error::{DeployError, TransformError};
use crate::scope::Target;
use crate::sources::SourceFile;
use crate::transform::RuleSet;

/// Syntax of a target tool's shared config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML with `[table.name]` stanzas.
    Toml,
    /// A JSON object whose keys are stanzas.
    Json,
}

impl ConfigFormat {
    /// Display name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Location and syntax of an adapter's config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigFile {
    /// Path relative to the scope root.
    pub path: &'static str,
    /// File syntax.
    pub format: ConfigFormat,
}

/// A named block written into a config file.
///
/// The name is dotted: `agents.gsd-executor` addresses the table
/// `[agents.gsd-executor]` in TOML or `{"agents": {"gsd-executor": ..}}` in
/// JSON. Entries are string key/value pairs in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    /// Dotted stanza name.
    pub name: String,
    /// Key/value pairs, in order.
    pub entries: Vec<(String, String)>,
}

impl Stanza {
    /// Create a stanza.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    #[must_use]
    pub fn entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }
}

/// A target tool: layout, content rewriting, and config registration.
pub trait Adapter: fmt::Debug + Send + Sync {
    /// Registry name, e.g. `codex`.
    fn name(&self) -> &'static str;

    /// Human-readable tool name.
    fn display_name(&self) -> &'static str;

    /// Directory name of the tool's config root, e.g. `.codex`.
    fn config_dir_name(&self) -> &'static str;

    /// Environment variable that overrides the global root, if any.
    fn home_env_var(&self) -> Option<&'static str> {
        None
    }

    /// Destination of `source`, `/`-separated and relative to the scope root.
    fn destination(&self, source: &SourceFile) -> String;

    /// Content rewrites for installing into `target`, in application order.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule pattern fails to compile.
    fn rewrite_rules(&self, target: &Target) -> Result<RuleSet, TransformError>;

    /// The tool's shared config file.
    fn config_file(&self) -> ConfigFile;

    /// Stanzas that register the `installed` sources with the tool.
    fn registrations(&self, installed: &[&SourceFile], target: &Target) -> Vec<Stanza>;
}

static ADAPTERS: [&dyn Adapter; 2] = [&codex::Codex, &claude::Claude];

/// Every supported adapter, in help-text order.
#[must_use]
pub fn all() -> &'static [&'static dyn Adapter] {
    &ADAPTERS
}

/// Comma-separated adapter names.
#[must_use]
pub fn known_names() -> String {
    ADAPTERS
        .iter()
        .map(|a| a.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Look up an adapter by name (case-insensitive).
///
/// # Errors
///
/// Returns [`DeployError::AdapterLookup`] if no adapter has that name.
pub fn lookup(name: &str) -> Result<&'static dyn Adapter, DeployError> {
    ADAPTERS
        .iter()
        .copied()
        .find(|a| a.name().eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| DeployError::AdapterLookup {
            name: name.to_string(),
            known: known_names(),
        })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;

    #[test]
    fn lookup_finds_each_adapter() {
        for name in ["codex", "claude"] {
            assert_eq!(lookup(name).unwrap().name(), name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("Codex").unwrap().name(), "codex");
    }

    #[test]
    fn lookup_unknown_adapter_fails() {
        let err = lookup("emacs").unwrap_err();
        assert!(
            matches!(err, DeployError::AdapterLookup { ref name, .. } if name == "emacs"),
            "unexpected error: {err}"
        );
        assert!(err.to_string().contains("codex, claude"));
    }

    #[test]
    fn adapter_names_are_unique() {
        let mut names: Vec<&str> = all().iter().map(|a| a.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn command_layouts_differ_between_adapters() {
        let source = SourceFile::new(SourceKind::Command, "new-project", "");
        let codex = lookup("codex").unwrap().destination(&source);
        let claude = lookup("claude").unwrap().destination(&source);
        assert_eq!(codex, "skills/gsd-new-project/SKILL.md");
        assert_eq!(claude, "commands/gsd/new-project.md");
    }

    #[test]
    fn config_files_differ_between_adapters() {
        let codex = lookup("codex").unwrap().config_file();
        let claude = lookup("claude").unwrap().config_file();
        assert_ne!(codex.path, claude.path);
        assert_eq!(codex.format, ConfigFormat::Toml);
        assert_eq!(claude.format, ConfigFormat::Json);
    }

    #[test]
    fn stanza_builder_keeps_entry_order() {
        let s = Stanza::new("a.b").entry("z", "1").entry("a", "2");
        assert_eq!(s.entries[0].0, "z");
        assert_eq!(s.entries[1].0, "a");
    }
}
