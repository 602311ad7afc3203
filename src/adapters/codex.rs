//! Codex: flat `skills/` directory and `[agents.<role>]` tables in
//! `config.toml`.
use super::{Adapter, ConfigFile, ConfigFormat, Stanza};
use crate::error::TransformError;
use crate::scope::Target;
use crate::sources::{NAMESPACE, SourceFile, SourceKind, WORKFLOWS_DIR};
use crate::transform::{Rewrite, RuleSet};

/// Marker inserted into every installed file.
pub const MARKER: &str = "<!-- Adapted for Codex by skill-deploy. Invoke skills as $gsd-<name>. -->";

/// The Codex adapter.
#[derive(Debug, Clone, Copy)]
pub struct Codex;

impl Adapter for Codex {
    fn name(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex"
    }

    fn config_dir_name(&self) -> &'static str {
        ".codex"
    }

    fn home_env_var(&self) -> Option<&'static str> {
        Some("CODEX_HOME")
    }

    fn destination(&self, source: &SourceFile) -> String {
        match source.kind {
            SourceKind::Command => format!("skills/{}/SKILL.md", source.id()),
            SourceKind::Workflow => format!("{WORKFLOWS_DIR}/{}.md", source.name),
            SourceKind::Agent => format!("agents/{}.md", source.name),
        }
    }

    fn rewrite_rules(&self, target: &Target) -> Result<RuleSet, TransformError> {
        Ok(RuleSet::new(vec![
            Rewrite::invocation(NAMESPACE, "$", '-')?,
            Rewrite::redelimit(NAMESPACE, ':', '-')?,
            Rewrite::home_path(".claude", &target.path_prefix)?,
            Rewrite::project_path(".claude", &target.path_prefix)?,
            Rewrite::annotate(MARKER),
        ]))
    }

    fn config_file(&self) -> ConfigFile {
        ConfigFile {
            path: "config.toml",
            format: ConfigFormat::Toml,
        }
    }

    fn registrations(&self, installed: &[&SourceFile], _target: &Target) -> Vec<Stanza> {
        installed
            .iter()
            .filter(|s| s.kind == SourceKind::Agent)
            .map(|agent| {
                let description = agent
                    .description()
                    .map_or_else(|| format!("{} agent", agent.name), str::to_string);
                Stanza::new(format!("agents.{}", agent.name))
                    .entry("description", description)
                    .entry("config_file", self.destination(agent))
            })
            .collect()
    }
}
