//! Manifest-driven deployment of skill, workflow and agent definitions.
//!
//! Installs a bundled set of templates into the config tree of an AI coding
//! tool (an *adapter*, e.g. Codex or Claude Code) at global or project scope,
//! and later removes exactly what it installed.
//!
//! The public API is organised into layers:
//!
//! - **[`sources`]** and **[`transform`]**: templates and the rewrite pipeline
//! - **[`adapters`]**: per-tool layout, rewrites and config registration
//! - **[`resources`]**: idempotent `check + apply + remove` primitives
//! - **[`manifest`]**: the ownership record that makes uninstall exact
//! - **[`commands`]**: `install` / `uninstall` orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod resources;
pub mod scope;
pub mod sources;
pub mod transform;
