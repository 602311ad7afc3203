//! Claude: nested `commands/gsd/` directory and a `gsd` key in
//! `settings.json`.
use super::{Adapter, ConfigFile, ConfigFormat, Stanza};
use crate::error::TransformError;
use crate::scope::Target;
use crate::sources::{AGENTS_DIR, COMMANDS_DIR, SourceFile, SourceKind, WORKFLOWS_DIR};
use crate::transform::{Rewrite, RuleSet};

/// Prefix templates are written against.
const NATIVE_PREFIX: &str = "~/.claude/";

/// The Claude adapter.
#[derive(Debug, Clone, Copy)]
pub struct Claude;

impl Adapter for Claude {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude"
    }

    fn config_dir_name(&self) -> &'static str {
        ".claude"
    }

    fn home_env_var(&self) -> Option<&'static str> {
        Some("CLAUDE_CONFIG_DIR")
    }

    fn destination(&self, source: &SourceFile) -> String {
        match source.kind {
            SourceKind::Command => format!("{COMMANDS_DIR}/{}.md", source.name),
            SourceKind::Workflow => format!("{WORKFLOWS_DIR}/{}.md", source.name),
            SourceKind::Agent => format!("{AGENTS_DIR}/{}.md", source.name),
        }
    }

    fn rewrite_rules(&self, target: &Target) -> Result<RuleSet, TransformError> {
        if target.path_prefix == NATIVE_PREFIX {
            return Ok(RuleSet::default());
        }
        Ok(RuleSet::new(vec![Rewrite::home_path(
            ".claude",
            &target.path_prefix,
        )?]))
    }

    fn config_file(&self) -> ConfigFile {
        ConfigFile {
            path: "settings.json",
            format: ConfigFormat::Json,
        }
    }

    fn registrations(&self, installed: &[&SourceFile], _target: &Target) -> Vec<Stanza> {
        if installed.is_empty() {
            return Vec::new();
        }
        vec![
            Stanza::new("gsd")
                .entry("installer", "skill-deploy")
                .entry("commands", COMMANDS_DIR)
                .entry("workflows", WORKFLOWS_DIR)
                .entry("agents", AGENTS_DIR),
        ]
    }
}
