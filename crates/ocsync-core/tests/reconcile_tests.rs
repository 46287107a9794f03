mod common;

use common::{Machine, acme_config};
use ocsync_core::{Overrides, Platform, SyncConfig, SyncPlan, build_plan, sync_local_to_repo, sync_repo_to_local};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn plan_for(machine: &Machine, config: &SyncConfig) -> SyncPlan {
    let root = machine.locations.repo_root(config);
    std::fs::create_dir_all(&root).unwrap();
    build_plan(config, &machine.locations, &root, Platform::Unix)
}

fn parse(text: Option<String>) -> Value {
    serde_json::from_str(&text.expect("file should exist")).unwrap()
}

fn written(report: &ocsync_core::ReconcileReport) -> Vec<&str> {
    report.written.iter().map(|p| p.as_str()).collect()
}

#[test]
fn test_round_trip_without_changes_writes_nothing() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    machine.write_local("opencode.json", "{\n  \"theme\": \"dark\"\n}\n");
    machine.write_local("AGENTS.md", "# agents");
    machine.write_local("agent/review.md", "review");

    let first = sync_local_to_repo(&plan, &Overrides::default()).unwrap();
    assert_eq!(
        written(&first),
        vec!["config/opencode.json", "config/AGENTS.md", "config/agent/review.md"]
    );

    let back = sync_repo_to_local(&plan, &Overrides::default()).unwrap();
    assert!(back.is_empty(), "pull after push rewrote {:?}", back.written);
    let again = sync_local_to_repo(&plan, &Overrides::default()).unwrap();
    assert!(again.is_empty(), "second push rewrote {:?}", again.written);
}

#[test]
fn test_pull_keeps_local_only_files() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    machine.write_repo("config/agent/shared.md", "shared");
    machine.write_local("agent/scratch.md", "mine");

    sync_repo_to_local(&plan, &Overrides::default()).unwrap();

    assert_eq!(machine.read_local("agent/shared.md").as_deref(), Some("shared"));
    assert_eq!(machine.read_local("agent/scratch.md").as_deref(), Some("mine"));
}

#[test]
fn test_push_propagates_deletions_inside_directories() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    machine.write_repo("config/command/old.md", "old");
    machine.write_repo("config/command/nested/gone.md", "gone");
    machine.write_local("command/new.md", "new");

    let report = sync_local_to_repo(&plan, &Overrides::default()).unwrap();

    assert_eq!(machine.read_repo("config/command/new.md").as_deref(), Some("new"));
    assert_eq!(machine.read_repo("config/command/old.md"), None);
    assert!(!machine.repo_root().join("config/command/nested").exists());
    let mut removed: Vec<&str> = report.removed.iter().map(|p| p.as_str()).collect();
    removed.sort();
    assert_eq!(removed, vec!["config/command/nested/gone.md", "config/command/old.md"]);
}

#[test]
fn test_missing_sources_are_skipped() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    machine.write_repo("config/AGENTS.md", "# keep");
    machine.write_repo("config/themes/night.json", "{}");

    let report = sync_local_to_repo(&plan, &Overrides::default()).unwrap();

    assert!(report.is_empty());
    assert_eq!(machine.read_repo("config/AGENTS.md").as_deref(), Some("# keep"));
    assert_eq!(machine.read_repo("config/themes/night.json").as_deref(), Some("{}"));
}

#[test]
fn test_overrides_win_after_pull_and_stay_out_of_repo() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    machine.write_repo(
        "config/opencode.json",
        "{\"theme\":\"dark\",\"model\":\"anthropic/sonnet\",\"mcp\":{\"docs\":{\"enabled\":true}}}",
    );
    let overrides = Overrides::new(
        json!({"model": "ollama/llama3", "mcp": {"docs": {"enabled": false}}})
            .as_object()
            .cloned()
            .unwrap(),
    );

    sync_repo_to_local(&plan, &overrides).unwrap();
    assert_eq!(
        parse(machine.read_local("opencode.json")),
        json!({"theme": "dark", "model": "ollama/llama3", "mcp": {"docs": {"enabled": false}}})
    );

    // Untouched local copy publishes nothing
    let unchanged = sync_local_to_repo(&plan, &overrides).unwrap();
    assert!(unchanged.is_empty());

    // An edit to a shared key is published, overridden keys keep repo values
    machine.write_local(
        "opencode.json",
        "{\"theme\":\"light\",\"model\":\"ollama/llama3\",\"mcp\":{\"docs\":{\"enabled\":false}}}",
    );
    let report = sync_local_to_repo(&plan, &overrides).unwrap();
    assert_eq!(written(&report), vec!["config/opencode.json"]);
    assert_eq!(
        parse(machine.read_repo("config/opencode.json")),
        json!({"theme": "light", "model": "anthropic/sonnet", "mcp": {"docs": {"enabled": true}}})
    );
}

#[test]
fn test_overrides_apply_to_local_only_config() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    machine.write_local("opencode.json", "{\"theme\":\"dark\"}");
    let overrides = Overrides::new(json!({"autoupdate": false}).as_object().cloned().unwrap());

    sync_repo_to_local(&plan, &overrides).unwrap();

    assert_eq!(
        parse(machine.read_local("opencode.json")),
        json!({"theme": "dark", "autoupdate": false})
    );
}

#[test]
fn test_jsonc_config_with_comments_is_published_without_overrides() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    let content = "{\n  // shared theme\n  \"theme\": \"dark\"\n}\n";
    machine.write_local("opencode.jsonc", content);

    sync_local_to_repo(&plan, &Overrides::default()).unwrap();

    assert_eq!(machine.read_repo("config/opencode.jsonc").as_deref(), Some(content));
}

#[test]
fn test_jsonc_config_with_overrides_is_rewritten_without_comments() {
    let machine = Machine::new();
    let plan = plan_for(&machine, &acme_config());
    machine.write_local(
        "opencode.jsonc",
        "{\n  // shared theme\n  \"theme\": \"dark\",\n  \"model\": \"ollama/llama3\"\n}\n",
    );
    let overrides = Overrides::new(json!({"model": "ollama/llama3"}).as_object().cloned().unwrap());

    sync_local_to_repo(&plan, &overrides).unwrap();

    let published = machine.read_repo("config/opencode.jsonc").unwrap();
    assert!(!published.contains("// shared theme"));
    assert_eq!(parse(Some(published)), json!({"theme": "dark"}));
}

#[test]
fn test_secrets_stay_out_unless_enabled() {
    let machine = Machine::new();
    machine.write_data("auth.json", "{\"token\":\"t\"}");

    let plan = plan_for(&machine, &acme_config());
    sync_local_to_repo(&plan, &Overrides::default()).unwrap();
    assert_eq!(machine.read_repo("data/auth.json"), None);

    let mut config = acme_config();
    config.include_secrets = true;
    let plan = plan_for(&machine, &config);
    sync_local_to_repo(&plan, &Overrides::default()).unwrap();
    assert_eq!(machine.read_repo("data/auth.json").as_deref(), Some("{\"token\":\"t\"}"));
}

#[cfg(unix)]
#[test]
fn test_pulled_secrets_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let machine = Machine::new();
    let mut config = acme_config();
    config.include_secrets = true;
    config.extra_secret_paths = vec!["~/.netrc".into()];
    let plan = plan_for(&machine, &config);
    machine.write_repo("data/auth.json", "{\"token\":\"t\"}");
    machine.write_repo("secrets/extra/home/.netrc", "machine example.com");

    sync_repo_to_local(&plan, &Overrides::default()).unwrap();

    for path in [
        machine.locations.data_dir.join("auth.json"),
        machine.sandbox.home().join(".netrc"),
    ] {
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "{}", path.display());
    }
}

#[test]
fn test_extra_secrets_manifest() {
    let machine = Machine::new();
    let mut config = acme_config();
    config.include_secrets = true;
    config.extra_secret_paths = vec!["~/.netrc".into(), "/nonexistent/ocsync/token".into()];
    let plan = plan_for(&machine, &config);
    std::fs::write(machine.sandbox.home().join(".netrc"), "machine example.com").unwrap();

    let report = sync_local_to_repo(&plan, &Overrides::default()).unwrap();

    assert_eq!(
        written(&report),
        vec!["secrets/extra/home/.netrc", "secrets/extra-manifest.json"]
    );
    assert_eq!(
        parse(machine.read_repo("secrets/extra-manifest.json")),
        json!({"entries": [
            {"sourcePath": "~/.netrc", "repoPath": "secrets/extra/home/.netrc"},
            {"sourcePath": "/nonexistent/ocsync/token", "repoPath": "secrets/extra/root/nonexistent/ocsync/token"}
        ]})
    );

    let again = sync_local_to_repo(&plan, &Overrides::default()).unwrap();
    assert!(again.is_empty());
}

#[test]
fn test_extra_secret_with_parent_segments_stays_in_clone() {
    let machine = Machine::new();
    let outside = tempfile::tempdir().unwrap();
    let source = outside.path().join("token.txt");
    std::fs::write(&source, "secret").unwrap();
    let absolute = source.to_string_lossy().into_owned();
    let configured = format!(
        "{}/stage/{}{}",
        outside.path().display(),
        "../".repeat(16),
        absolute.trim_start_matches('/')
    );

    let mut config = acme_config();
    config.include_secrets = true;
    config.extra_secret_paths = vec![configured];
    let plan = plan_for(&machine, &config);
    let entry = &plan.extra_secrets.entries[0];
    assert_eq!(entry.source_path, source);
    assert_eq!(
        entry.repo_relative_path.as_str(),
        format!("secrets/extra/root/{}", absolute.trim_start_matches('/'))
    );

    let report = sync_local_to_repo(&plan, &Overrides::default()).unwrap();

    let root = machine.repo_root();
    for rel in &report.written {
        assert!(plan.repo_path(rel).starts_with(&root), "{rel} left the clone");
    }
    assert_eq!(
        std::fs::read_to_string(plan.repo_path(&entry.repo_relative_path)).unwrap(),
        "secret"
    );
    assert_eq!(std::fs::read_dir(outside.path()).unwrap().count(), 1);
}
