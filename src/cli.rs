//! Command-line interface.
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::scope::Scope;

/// Version string embedded by `build.rs`, falling back to the crate version.
pub const VERSION: &str = match option_env!("SKILL_DEPLOY_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Top-level CLI entry point for the skill deployment engine.
#[derive(Parser, Debug)]
#[command(
    name = "skill-deploy",
    about = "Install or remove gsd skills, workflows and agents for AI coding tools",
    version = VERSION
)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["codex", "claude", "adapter"])
))]
#[command(group(ArgGroup::new("scope").required(true).args(["global", "local"])))]
pub struct Cli {
    /// Target Codex
    #[arg(long)]
    pub codex: bool,

    /// Target Claude Code
    #[arg(long)]
    pub claude: bool,

    /// Target an adapter by name
    #[arg(long, value_name = "NAME")]
    pub adapter: Option<String>,

    /// Install into the user-wide config directory
    #[arg(short, long)]
    pub global: bool,

    /// Install into the current project
    #[arg(short, long)]
    pub local: bool,

    /// Override the destination directory
    #[arg(short, long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Remove a previous install instead
    #[arg(short, long)]
    pub uninstall: bool,

    /// Install only these source identifiers (comma separated)
    #[arg(long, value_delimiter = ',', value_name = "ID", conflicts_with = "uninstall")]
    pub only: Vec<String>,

    /// Read templates from this directory instead of the bundled set
    #[arg(long, env = "SKILL_DEPLOY_SOURCE", value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Name of the selected adapter.
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        if self.codex {
            "codex"
        } else if self.claude {
            "claude"
        } else {
            self.adapter.as_deref().unwrap_or_default()
        }
    }

    /// Selected scope.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        if self.local {
            Scope::Local
        } else {
            Scope::Global
        }
    }
}
