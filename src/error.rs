//! Domain-specific error types for the deployment engine.
//!
//! Engine operations return [`DeployError`]; lower layers use their own small
//! error enums ([`RegistrationError`], [`TransformError`]) which are wrapped
//! with adapter and path context on the way up. The binary converts
//! everything to [`anyhow::Error`] at the CLI boundary via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! DeployError
//! ├── AdapterLookup        — unknown adapter name, before any mutation
//! ├── UnknownSource        — `--only` names a source that does not exist
//! ├── Write / Remove       — filesystem failures during install / uninstall
//! ├── ManifestCorrupt      — manifest exists but cannot be trusted
//! ├── ConfigRegistration   — target config file cannot be edited safely
//! ├── Transform            — rewrite rule could not be built
//! └── Source / Io          — template or other I/O failures
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::scope::Scope;

/// Top-level error type for install and uninstall operations.
#[derive(Error, Debug)]
pub enum DeployError {
    /// The adapter name is not in the registry.
    #[error("unknown adapter '{name}': expected one of {known}")]
    AdapterLookup {
        /// Name that was requested.
        name: String,
        /// Comma-separated list of supported adapter names.
        known: String,
    },

    /// A requested source identifier does not exist in the source set.
    #[error("unknown source '{id}' for adapter '{adapter}'")]
    UnknownSource {
        /// Identifier that was requested.
        id: String,
        /// Adapter the install was run for.
        adapter: String,
    },

    /// Writing a destination file or directory failed.
    #[error("failed to write {path} for adapter '{adapter}' ({scope} scope): {source}")]
    Write {
        /// Adapter being installed.
        adapter: String,
        /// Scope being installed.
        scope: Scope,
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Removing a tracked file failed.
    #[error("failed to remove {path} for adapter '{adapter}' ({scope} scope): {source}")]
    Remove {
        /// Adapter being uninstalled.
        adapter: String,
        /// Scope being uninstalled.
        scope: Scope,
        /// Path that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The manifest file exists but is not usable.
    #[error("manifest {path} is corrupt: {reason}")]
    ManifestCorrupt {
        /// Path to the manifest file.
        path: PathBuf,
        /// Why the manifest was rejected.
        reason: String,
    },

    /// The target tool's config file could not be edited.
    #[error("cannot register adapter '{adapter}' in {path}: {source}")]
    ConfigRegistration {
        /// Adapter whose stanza was being edited.
        adapter: String,
        /// Path to the config file.
        path: PathBuf,
        /// Underlying registration failure.
        source: RegistrationError,
    },

    /// An adapter's rewrite rules could not be built.
    #[error("invalid rewrite rules for adapter '{adapter}': {source}")]
    Transform {
        /// Adapter whose rules failed.
        adapter: String,
        /// Underlying transform error.
        source: TransformError,
    },

    /// Source templates could not be read.
    #[error("failed to read source templates from {path}: {source}")]
    Source {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Any other I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Errors from inserting or removing a stanza in a target config file.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The existing file is not valid for its format.
    #[error("cannot parse existing {format} config: {reason}")]
    Parse {
        /// Format name (`TOML` or `JSON`).
        format: &'static str,
        /// Parser message.
        reason: String,
    },

    /// A path segment of the stanza name exists but is not a table/object.
    #[error("'{segment}' in stanza '{stanza}' is not a table")]
    NotATable {
        /// Full dotted stanza name.
        stanza: String,
        /// Offending segment.
        segment: String,
    },

    /// The stanza name is empty or has an empty segment.
    #[error("invalid stanza name '{0}'")]
    InvalidName(String),

    /// Reading or writing the config file failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors from building rewrite rules.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A rule pattern failed to compile.
    #[error("invalid pattern for rule '{rule}': {source}")]
    Pattern {
        /// Rule description.
        rule: String,
        /// Regex compile error.
        source: regex::Error,
    },
}
