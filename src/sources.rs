//! Skill, workflow, and agent templates that get deployed.
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use crate::error::DeployError;

/// Source directory holding slash-command templates.
pub const COMMANDS_DIR: &str = "commands/gsd";
/// Source directory holding workflow templates.
pub const WORKFLOWS_DIR: &str = "get-shit-done/workflows";
/// Source directory holding agent role templates.
pub const AGENTS_DIR: &str = "agents";

/// Identifier namespace shared by every command.
pub const NAMESPACE: &str = "gsd";

/// What a template is, which decides where an adapter puts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    /// A user-invocable command / skill.
    Command,
    /// A workflow document referenced by commands.
    Workflow,
    /// An agent role definition.
    Agent,
}

impl SourceKind {
    /// Source subdirectory for this kind.
    #[must_use]
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Command => COMMANDS_DIR,
            Self::Workflow => WORKFLOWS_DIR,
            Self::Agent => AGENTS_DIR,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Workflow => f.write_str("workflow"),
            Self::Agent => f.write_str("agent"),
        }
    }
}

/// One immutable template prior to adapter-specific transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Template kind.
    pub kind: SourceKind,
    /// File stem, e.g. `new-project` or `gsd-executor`.
    pub name: String,
    /// Raw template content.
    pub content: Cow<'static, str>,
}

impl SourceFile {
    /// Create a source file.
    #[must_use]
    pub fn new(kind: SourceKind, name: impl Into<String>, content: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            name: name.into(),
            content: content.into(),
        }
    }

    /// Stable identifier used in the manifest and by `--only`.
    ///
    /// ```
    /// use skill_deploy::sources::{SourceFile, SourceKind};
    ///
    /// assert_eq!(SourceFile::new(SourceKind::Command, "new-project", "").id(), "gsd-new-project");
    /// assert_eq!(SourceFile::new(SourceKind::Agent, "gsd-executor", "").id(), "gsd-executor");
    /// assert_eq!(SourceFile::new(SourceKind::Workflow, "new-project", "").id(), "workflows/new-project");
    /// ```
    #[must_use]
    pub fn id(&self) -> String {
        match self.kind {
            SourceKind::Command => format!("{NAMESPACE}-{}", self.name),
            SourceKind::Workflow => format!("workflows/{}", self.name),
            SourceKind::Agent => self.name.clone(),
        }
    }

    /// The `description:` value from the YAML front matter, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        front_matter(&self.content)?
            .lines()
            .find_map(|line| line.strip_prefix("description:"))
            .map(|v| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    }
}

/// Return the body of a leading `---` delimited front matter block.
#[must_use]
pub fn front_matter(content: &str) -> Option<&str> {
    let end = front_matter_len(content)?;
    let block = content.get(..end)?;
    let inner = block.strip_prefix("---")?.trim_start_matches(['\r', '\n']);
    let close = inner.rfind("---")?;
    inner.get(..close)
}

/// Byte length of the leading front matter block including its closing
/// delimiter line, or `None` if the content has none.
#[must_use]
pub fn front_matter_len(content: &str) -> Option<usize> {
    let first_len = if content.starts_with("---\n") {
        4
    } else if content.starts_with("---\r\n") {
        5
    } else {
        return None;
    };
    let mut offset = first_len;
    for line in content.get(first_len..)?.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == "---" {
            return Some(offset);
        }
    }
    None
}

macro_rules! bundled {
    ($($kind:ident $name:literal => $path:literal),+ $(,)?) => {
        vec![$(SourceFile::new(
            SourceKind::$kind,
            $name,
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $path)),
        )),+]
    };
}

/// An ordered, de-duplicated set of source files.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    files: Vec<SourceFile>,
}

impl SourceSet {
    /// Templates compiled into the binary.
    #[must_use]
    pub fn bundled() -> Self {
        Self::from_files(bundled![
            Command "new-project" => "commands/gsd/new-project.md",
            Command "plan-phase" => "commands/gsd/plan-phase.md",
            Command "execute-phase" => "commands/gsd/execute-phase.md",
            Command "progress" => "commands/gsd/progress.md",
            Workflow "new-project" => "get-shit-done/workflows/new-project.md",
            Workflow "execute-phase" => "get-shit-done/workflows/execute-phase.md",
            Agent "gsd-executor" => "agents/gsd-executor.md",
            Agent "gsd-planner" => "agents/gsd-planner.md",
        ])
    }

    /// Build a set from explicit files, sorted by identifier. Later
    /// duplicates of an identifier are dropped.
    #[must_use]
    pub fn from_files(mut files: Vec<SourceFile>) -> Self {
        files.sort_by_key(SourceFile::id);
        files.dedup_by_key(|f| f.id());
        Self { files }
    }

    /// Load templates from a directory laid out like the bundled set
    /// (`commands/gsd/`, `get-shit-done/workflows/`, `agents/`). Missing
    /// subdirectories are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a subdirectory or template cannot be read.
    pub fn from_dir(root: &Path) -> Result<Self, DeployError> {
        let mut files = Vec::new();
        for kind in [SourceKind::Command, SourceKind::Workflow, SourceKind::Agent] {
            let dir = root.join(kind.dir());
            if !dir.is_dir() {
                continue;
            }
            let read_err = |source| DeployError::Source {
                path: dir.clone(),
                source,
            };
            for entry in std::fs::read_dir(&dir).map_err(read_err)? {
                let path = entry.map_err(read_err)?.path();
                if !path.is_file() || path.extension().is_none_or(|e| e != "md") {
                    continue;
                }
                let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
                else {
                    continue;
                };
                let content = std::fs::read_to_string(&path).map_err(|source| {
                    DeployError::Source {
                        path: path.clone(),
                        source,
                    }
                })?;
                files.push(SourceFile::new(kind, name, content));
            }
        }
        Ok(Self::from_files(files))
    }

    /// All files in identifier order.
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Number of files in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Select the files named by `only`, or every file when `only` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::UnknownSource`] for the first identifier not in
    /// the set.
    pub fn select(&self, only: &[String], adapter: &str) -> Result<Vec<&SourceFile>, DeployError> {
        if only.is_empty() {
            return Ok(self.files.iter().collect());
        }
        for id in only {
            if !self.files.iter().any(|f| &f.id() == id) {
                return Err(DeployError::UnknownSource {
                    id: id.clone(),
                    adapter: adapter.to_string(),
                });
            }
        }
        Ok(self
            .files
            .iter()
            .filter(|f| only.contains(&f.id()))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn bundled_set_is_sorted_and_complete() {
        let set = SourceSet::bundled();
        let ids: Vec<String> = set.files().iter().map(SourceFile::id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(set.len(), 8);
        assert!(ids.contains(&"gsd-new-project".to_string()));
        assert!(ids.contains(&"workflows/execute-phase".to_string()));
    }

    #[test]
    fn description_reads_front_matter() {
        let f = SourceFile::new(
            SourceKind::Agent,
            "gsd-x",
            "---\nname: gsd-x\ndescription: \"Does things\"\n---\nbody\n",
        );
        assert_eq!(f.description(), Some("Does things"));
    }

    #[test]
    fn description_absent_without_front_matter() {
        let f = SourceFile::new(SourceKind::Workflow, "w", "description: not front matter\n");
        assert_eq!(f.description(), None);
    }

    #[test]
    fn front_matter_len_covers_closing_delimiter() {
        let content = "---\na: b\n---\nbody";
        assert_eq!(front_matter_len(content), Some(13));
        assert_eq!(&content[13..], "body");
    }

    #[test]
    fn front_matter_len_none_when_unclosed() {
        assert_eq!(front_matter_len("---\na: b\nbody"), None);
    }

    #[test]
    fn select_all_when_filter_empty() {
        let set = SourceSet::bundled();
        assert_eq!(set.select(&[], "codex").unwrap().len(), set.len());
    }

    #[test]
    fn select_filters_by_id() {
        let set = SourceSet::bundled();
        let picked = set
            .select(&["gsd-progress".to_string()], "codex")
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "progress");
    }

    #[test]
    fn select_rejects_unknown_id() {
        let set = SourceSet::bundled();
        let err = set
            .select(&["gsd-nope".to_string()], "codex")
            .unwrap_err();
        assert!(matches!(err, DeployError::UnknownSource { ref id, .. } if id == "gsd-nope"));
    }

    #[test]
    fn from_dir_loads_layout() {
        let dir = tempfile::tempdir().unwrap();
        let commands = dir.path().join(COMMANDS_DIR);
        std::fs::create_dir_all(&commands).unwrap();
        std::fs::write(commands.join("hello.md"), "hi").unwrap();
        std::fs::write(commands.join("notes.txt"), "ignored").unwrap();
        let agents = dir.path().join(AGENTS_DIR);
        std::fs::create_dir_all(&agents).unwrap();
        std::fs::write(agents.join("gsd-helper.md"), "agent").unwrap();

        let set = SourceSet::from_dir(dir.path()).unwrap();
        let ids: Vec<String> = set.files().iter().map(SourceFile::id).collect();
        assert_eq!(ids, vec!["gsd-hello", "gsd-helper"]);
    }
}
