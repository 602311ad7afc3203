#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `install` command.
//!
//! These tests run the engine against an isolated home and project
//! directory and verify:
//! - scope resolution and the resulting destination layout
//! - the Codex and Claude rewrites of the bundled templates
//! - idempotence of repeated installs
//! - that failures before the first write leave the tree untouched
//! - that a failure halfway is recorded and can be uninstalled

mod common;

use skill_deploy::commands::InstallOptions;
use skill_deploy::error::DeployError;
use skill_deploy::manifest::MANIFEST_FILE;
use skill_deploy::scope::{Paths, Scope};

use common::{IntegrationTestContext, read, snapshot_tree};

const CODEX_FILES: [&str; 8] = [
    "agents/gsd-executor.md",
    "agents/gsd-planner.md",
    "get-shit-done/workflows/execute-phase.md",
    "get-shit-done/workflows/new-project.md",
    "skills/gsd-execute-phase/SKILL.md",
    "skills/gsd-new-project/SKILL.md",
    "skills/gsd-plan-phase/SKILL.md",
    "skills/gsd-progress/SKILL.md",
];

const CLAUDE_FILES: [&str; 8] = [
    "agents/gsd-executor.md",
    "agents/gsd-planner.md",
    "commands/gsd/execute-phase.md",
    "commands/gsd/new-project.md",
    "commands/gsd/plan-phase.md",
    "commands/gsd/progress.md",
    "get-shit-done/workflows/execute-phase.md",
    "get-shit-done/workflows/new-project.md",
];

// ---------------------------------------------------------------------------
// Scope resolution
// ---------------------------------------------------------------------------

/// A global install lands under the home directory and nowhere else.
#[test]
fn codex_global_installs_under_home() {
    let ctx = IntegrationTestContext::new();
    let result = ctx.install("codex", Scope::Global).unwrap();

    let root = ctx.root("codex", Scope::Global);
    assert_eq!(result.root, root);
    for file in CODEX_FILES {
        assert!(root.join(file).is_file(), "missing {file}");
    }
    assert!(root.join("config.toml").is_file());
    assert_eq!(result.manifest_path, root.join(MANIFEST_FILE));
    assert!(result.manifest_path.is_file());
    assert_eq!(result.files_written, CODEX_FILES.len());
    assert_eq!(result.stanzas_registered, 2);
    assert!(snapshot_tree(ctx.project()).is_empty());
}

/// A local install lands under the project directory with its own manifest.
#[test]
fn codex_local_installs_under_project() {
    let ctx = IntegrationTestContext::new();
    ctx.install("codex", Scope::Local).unwrap();

    let root = ctx.root("codex", Scope::Local);
    for file in CODEX_FILES {
        assert!(root.join(file).is_file(), "missing {file}");
    }
    assert!(root.join(MANIFEST_FILE).is_file());
    assert!(snapshot_tree(ctx.home()).is_empty());
}

/// Global and local installs of the same adapter keep separate manifests.
#[test]
fn global_and_local_manifests_are_separate() {
    let ctx = IntegrationTestContext::new();
    let global = ctx.install("codex", Scope::Global).unwrap();
    let local = ctx.install("codex", Scope::Local).unwrap();

    assert_ne!(global.manifest_path, local.manifest_path);
    let global_manifest = read(&global.manifest_path);
    let local_manifest = read(&local.manifest_path);
    assert!(global_manifest.contains(r#""scope": "global""#));
    assert!(local_manifest.contains(r#""scope": "local""#));
}

/// An explicit `--config-dir` starting with `~` is expanded against home.
#[test]
fn config_dir_with_tilde_expands_to_home() {
    let ctx = IntegrationTestContext::new();
    let options = InstallOptions {
        config_dir: Some("~/alt-codex".into()),
        ..InstallOptions::default()
    };
    let result = ctx.install_with("codex", Scope::Global, &options).unwrap();

    let root = ctx.home().join("alt-codex");
    assert_eq!(result.root, root);
    assert!(root.join("skills/gsd-progress/SKILL.md").is_file());
    assert!(!ctx.root("codex", Scope::Global).exists());
}

/// A global root override (e.g. `CODEX_HOME`) moves the install and the
/// paths written into the installed content.
#[test]
fn global_override_rewrites_paths_to_override_root() {
    let mut ctx = IntegrationTestContext::new();
    let alt = ctx.dir.path().join("codex-home");
    ctx.paths = Paths::new(ctx.home().to_path_buf(), ctx.project().to_path_buf())
        .with_global_override("codex", alt.clone());

    ctx.install("codex", Scope::Global).unwrap();

    let agent = read(&alt.join("agents/gsd-executor.md"));
    let expected = format!("{}/get-shit-done/workflows/execute-phase.md", alt.display());
    assert!(agent.contains(&expected), "{agent}");
    assert!(!ctx.root("codex", Scope::Global).exists());
}

// ---------------------------------------------------------------------------
// Content transforms
// ---------------------------------------------------------------------------

/// The Codex skill for `progress` is renamed, annotated and has its slash
/// commands converted to `$` invocations.
#[test]
fn codex_progress_skill_content() {
    let ctx = IntegrationTestContext::new();
    ctx.install("codex", Scope::Global).unwrap();

    let skill = read(
        &ctx.root("codex", Scope::Global)
            .join("skills/gsd-progress/SKILL.md"),
    );
    insta::assert_snapshot!(skill, @r"
    ---
    name: gsd-progress
    description: Show project progress and route to the next action
    allowed-tools: Read, Bash
    ---

    <!-- Adapted for Codex by skill-deploy. Invoke skills as $gsd-<name>. -->

    <objective>
    Summarize where the project stands and recommend the next command.
    </objective>

    <process>
    Inspect `.planning/STATE.md`. If no project exists, recommend `$gsd-new-project`.
    Otherwise recommend `$gsd-plan-phase` or `$gsd-execute-phase` for the current phase.
    </process>
    ");
}

/// No Claude-specific reference survives the Codex transform.
#[test]
fn codex_files_have_no_claude_references() {
    let ctx = IntegrationTestContext::new();
    ctx.install("codex", Scope::Global).unwrap();

    let root = ctx.root("codex", Scope::Global);
    for file in CODEX_FILES {
        let content = read(&root.join(file));
        assert!(!content.contains("gsd:"), "{file} still has gsd: in\n{content}");
        assert!(!content.contains(".claude/"), "{file} still points at .claude");
    }
}

/// Codex agents are registered as `[agents.<name>]` tables.
#[test]
fn codex_registers_agents_in_config_toml() {
    let ctx = IntegrationTestContext::new();
    ctx.install("codex", Scope::Global).unwrap();

    let config = read(&ctx.root("codex", Scope::Global).join("config.toml"));
    insta::assert_snapshot!(config, @r#"
    [agents.gsd-executor]
    description = "Executes a single plan with atomic commits and deviation handling"
    config_file = "agents/gsd-executor.md"

    [agents.gsd-planner]
    description = "Creates executable phase plans with task breakdown and verification"
    config_file = "agents/gsd-planner.md"
    "#);
}

/// Existing settings in the Codex config survive an install.
#[test]
fn codex_preserves_user_config() {
    let ctx = IntegrationTestContext::new();
    let root = ctx.root("codex", Scope::Global);
    std::fs::create_dir_all(&root).unwrap();
    let user = "# my settings\nmodel = \"o3\"\n\n[profiles.fast]\nmodel = \"o4-mini\"\n";
    std::fs::write(root.join("config.toml"), user).unwrap();

    ctx.install("codex", Scope::Global).unwrap();

    let config = read(&root.join("config.toml"));
    assert!(config.starts_with(user), "{config}");
    assert!(config.contains("[agents.gsd-executor]"));
}

/// A global Claude install copies the templates verbatim.
#[test]
fn claude_global_is_verbatim() {
    let ctx = IntegrationTestContext::new();
    ctx.install("claude", Scope::Global).unwrap();

    let root = ctx.root("claude", Scope::Global);
    for file in CLAUDE_FILES {
        assert!(root.join(file).is_file(), "missing {file}");
    }
    assert_eq!(
        read(&root.join("commands/gsd/new-project.md")),
        include_str!("../templates/commands/gsd/new-project.md")
    );
    assert_eq!(
        read(&root.join("agents/gsd-executor.md")),
        include_str!("../templates/agents/gsd-executor.md")
    );
}

/// A local Claude install points home-directory references at the project.
#[test]
fn claude_local_rewrites_home_paths() {
    let ctx = IntegrationTestContext::new();
    ctx.install("claude", Scope::Local).unwrap();

    let root = ctx.root("claude", Scope::Local);
    let command = read(&root.join("commands/gsd/new-project.md"));
    assert!(command.contains("@./.claude/get-shit-done/workflows/new-project.md"));
    assert!(!command.contains("~/.claude/"));
    assert!(command.contains("name: gsd:new-project"));
}

/// Claude gets a single `gsd` key in `settings.json`.
#[test]
fn claude_registers_settings_key() {
    let ctx = IntegrationTestContext::new();
    let result = ctx.install("claude", Scope::Global).unwrap();

    let root = ctx.root("claude", Scope::Global);
    assert_eq!(result.config_path, Some(root.join("settings.json")));
    let settings: serde_json::Value =
        serde_json::from_str(&read(&root.join("settings.json"))).unwrap();
    assert_eq!(settings["gsd"]["installer"], "skill-deploy");
    assert_eq!(settings["gsd"]["commands"], "commands/gsd");
}

// ---------------------------------------------------------------------------
// Idempotence and filtering
// ---------------------------------------------------------------------------

/// Installing twice leaves the tree, manifest included, byte-identical.
#[test]
fn reinstall_is_a_noop() {
    let ctx = IntegrationTestContext::new();
    ctx.install("codex", Scope::Global).unwrap();
    let root = ctx.root("codex", Scope::Global);
    let before = snapshot_tree(&root);

    let second = ctx.install("codex", Scope::Global).unwrap();

    assert_eq!(second.files_written, 0);
    assert_eq!(second.files_unchanged, CODEX_FILES.len());
    assert_eq!(second.stanzas_registered, 0);
    assert_eq!(second.files_pruned, 0);
    assert_eq!(snapshot_tree(&root), before);
}

/// `--only` installs the named sources and leaves the rest alone.
#[test]
fn only_installs_the_selected_sources() {
    let ctx = IntegrationTestContext::new();
    let options = InstallOptions {
        only: vec!["gsd-progress".to_string()],
        ..InstallOptions::default()
    };
    let result = ctx.install_with("codex", Scope::Global, &options).unwrap();

    assert_eq!(result.files_written, 1);
    assert_eq!(result.config_path, None);
    let root = ctx.root("codex", Scope::Global);
    let tree = snapshot_tree(&root);
    let files: Vec<&str> = tree
        .iter()
        .filter(|(_, v)| *v != "<dir>")
        .map(|(k, _)| k.as_str())
        .collect();
    assert_eq!(files, vec!["skill-deploy-manifest.json", "skills/gsd-progress/SKILL.md"]);
}

/// An unknown `--only` identifier fails before anything is written.
#[test]
fn only_with_unknown_source_writes_nothing() {
    let ctx = IntegrationTestContext::new();
    let options = InstallOptions {
        only: vec!["gsd-progress".to_string(), "gsd-missing".to_string()],
        ..InstallOptions::default()
    };
    let err = ctx
        .install_with("codex", Scope::Global, &options)
        .unwrap_err();
    assert!(matches!(err, DeployError::UnknownSource { ref id, .. } if id == "gsd-missing"));
    assert!(snapshot_tree(ctx.home()).is_empty());
}

// ---------------------------------------------------------------------------
// Pre-existing content
// ---------------------------------------------------------------------------

/// A file the engine does not own is moved aside and recorded as a backup.
#[test]
fn foreign_file_is_backed_up() {
    let ctx = IntegrationTestContext::new();
    let root = ctx.root("codex", Scope::Global);
    std::fs::create_dir_all(root.join("agents")).unwrap();
    std::fs::write(root.join("agents/gsd-executor.md"), "my own executor\n").unwrap();

    ctx.install("codex", Scope::Global).unwrap();

    assert_eq!(
        read(&root.join(".skill-deploy-backup/agents/gsd-executor.md")),
        "my own executor\n"
    );
    assert_ne!(read(&root.join("agents/gsd-executor.md")), "my own executor\n");
    let manifest = read(&root.join(MANIFEST_FILE));
    assert!(manifest.contains(r#""backup": ".skill-deploy-backup/agents/gsd-executor.md""#));
}

/// A tracked file edited by hand is saved to the patches directory before
/// a reinstall overwrites it.
#[test]
fn local_modification_is_preserved_on_reinstall() {
    let ctx = IntegrationTestContext::new();
    ctx.install("codex", Scope::Global).unwrap();
    let root = ctx.root("codex", Scope::Global);
    let skill = root.join("skills/gsd-progress/SKILL.md");
    let fresh = read(&skill);
    std::fs::write(&skill, "hand edited\n").unwrap();

    let result = ctx.install("codex", Scope::Global).unwrap();

    assert_eq!(result.files_written, 1);
    assert_eq!(read(&skill), fresh);
    assert_eq!(
        read(&root.join("skill-deploy-local-patches/skills/gsd-progress/SKILL.md")),
        "hand edited\n"
    );
    let warnings = ctx.warnings();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("modified locally"));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// A corrupt manifest aborts the install before any write.
#[test]
fn corrupt_manifest_is_rejected() {
    let ctx = IntegrationTestContext::new();
    let root = ctx.root("codex", Scope::Global);
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join(MANIFEST_FILE), "{ not json").unwrap();

    let err = ctx.install("codex", Scope::Global).unwrap_err();

    assert!(matches!(err, DeployError::ManifestCorrupt { .. }));
    assert!(!root.join("skills").exists());
    assert_eq!(read(&root.join(MANIFEST_FILE)), "{ not json");
}

/// An unparsable config file aborts the install before any write.
#[test]
fn broken_config_is_rejected_before_writing() {
    let ctx = IntegrationTestContext::new();
    let root = ctx.root("codex", Scope::Global);
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("config.toml"), "[agents\nmodel = 1\n").unwrap();

    let err = ctx.install("codex", Scope::Global).unwrap_err();

    assert!(matches!(err, DeployError::ConfigRegistration { .. }));
    assert_eq!(read(&root.join("config.toml")), "[agents\nmodel = 1\n");
    assert!(!root.join("skills").exists());
    assert!(!root.join(MANIFEST_FILE).exists());
}

/// A second adapter may not take over files another adapter installed into
/// the same root. The refusal comes before any write.
#[test]
fn shared_root_refuses_files_owned_by_another_adapter() {
    let ctx = IntegrationTestContext::new();
    let shared = ctx.dir.path().join("shared");
    let options = InstallOptions {
        config_dir: Some(shared.clone()),
        ..InstallOptions::default()
    };
    ctx.install_with("codex", Scope::Global, &options).unwrap();
    let before = snapshot_tree(&shared);

    let err = ctx
        .install_with("claude", Scope::Global, &options)
        .unwrap_err();

    assert!(
        matches!(
            &err,
            DeployError::Write { adapter, path, .. }
                if adapter == "claude" && CODEX_FILES.iter().any(|f| *path == shared.join(f))
        ),
        "unexpected error: {err}"
    );
    assert!(err.to_string().contains("already installed by adapter 'codex'"));
    assert_eq!(snapshot_tree(&shared), before);
}

/// A write failure halfway names the adapter, scope and path, and the files
/// written before it are recorded so uninstall can remove them.
#[test]
fn partial_failure_is_recorded_and_reversible() {
    let ctx = IntegrationTestContext::new();
    let root = ctx.root("codex", Scope::Global);
    std::fs::create_dir_all(root.join("skills/gsd-progress/SKILL.md")).unwrap();
    let before = snapshot_tree(&root);

    let err = ctx.install("codex", Scope::Global).unwrap_err();

    let blocked = root.join("skills/gsd-progress/SKILL.md");
    assert!(
        matches!(
            &err,
            DeployError::Write { adapter, scope, path, .. }
                if adapter == "codex" && *scope == Scope::Global && *path == blocked
        ),
        "unexpected error: {err}"
    );
    let manifest = read(&root.join(MANIFEST_FILE));
    assert!(manifest.contains("skills/gsd-execute-phase/SKILL.md"));
    assert!(manifest.contains("agents/gsd-executor.md"));
    assert!(!manifest.contains("skills/gsd-progress/SKILL.md"));

    let result = ctx.uninstall("codex", Scope::Global).unwrap();
    assert_eq!(result.files_removed, 5);
    assert!(result.manifest_deleted);
    assert_eq!(snapshot_tree(&root), before);
}
