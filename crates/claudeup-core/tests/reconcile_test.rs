//! Apply engine tests
//!
//! Tests for converging live settings to a profile: scope merge policy,
//! idempotence, partial install failure, post-apply hooks, dry runs and
//! bootstrapping. Installs go through a fake `claude` that records them in
//! the installed-plugin registry the way the real CLI does.

use claudeup_core::apply::{
    Action, ApplyOptions, CancelToken, ExtrasDecision, HookOutcome, HookRunner, Installer,
    Reconciler,
};
use claudeup_core::claudeup_live::{ClaudePaths, PluginKey, Scope};
use claudeup_core::pointer::ProjectPointer;
use claudeup_core::profile::{Marketplace, ProfileSource};
use claudeup_core::{Config, CoreError};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create dir");
    fs::write(path, content).expect("Failed to write");
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("Failed to read")).expect("Invalid JSON")
}

/// Stand-in for the `claude` CLI
#[derive(Clone)]
struct FakeClaude {
    paths: ClaudePaths,
    failing: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeClaude {
    fn new(paths: ClaudePaths) -> Self {
        Self {
            paths,
            failing: Arc::default(),
            calls: Arc::default(),
        }
    }

    fn fail(&self, key: &str) {
        self.failing.lock().unwrap().push(key.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn update(path: &Path, empty: Value, edit: impl FnOnce(&mut Value)) {
        let mut doc = fs::read_to_string(path)
            .ok()
            .and_then(|c| serde_json::from_str(&c).ok())
            .unwrap_or(empty);
        edit(&mut doc);
        write(path, &serde_json::to_string_pretty(&doc).unwrap());
    }
}

impl Installer for FakeClaude {
    fn add_marketplace(&self, marketplace: &Marketplace) -> Result<(), String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(format!("marketplace {}", marketplace.repo));
        let name = marketplace.repo.rsplit('/').next().unwrap().to_string();
        let source = json!({"source": marketplace.source, "repo": marketplace.repo});
        Self::update(&self.paths.known_marketplaces_path(), json!({}), |doc| {
            doc[name] = json!({ "source": source });
        });
        Ok(())
    }

    fn install_plugin(
        &self,
        key: &PluginKey,
        scope: Scope,
        project_dir: &Path,
    ) -> Result<(), String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(format!("install {key} {scope}"));
        if self.failing.lock().unwrap().contains(&key.to_string()) {
            return Err(format!("plugin {key} not found in marketplace"));
        }

        let mut record = json!({
            "scope": scope.as_str(),
            "installPath": format!("/cache/{}", key.name),
            "version": "1.0.0",
        });
        if scope != Scope::User {
            record["projectPath"] = json!(project_dir.to_string_lossy());
        }
        let empty = json!({"version": 2, "plugins": {}});
        Self::update(&self.paths.installed_plugins_path(), empty, |doc| {
            let entry = &mut doc["plugins"][key.to_string()];
            if !entry.is_array() {
                *entry = json!([]);
            }
            entry.as_array_mut().unwrap().push(record);
        });
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingHook {
    calls: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingHook {
    fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl HookRunner for RecordingHook {
    fn run(&self, command: &str, _project_dir: &Path) -> Result<(), String> {
        self.calls.lock().unwrap().push(command.to_string());
        if self.fail.load(Ordering::SeqCst) {
            Err("exit status 2".to_string())
        } else {
            Ok(())
        }
    }
}

struct Fixture {
    _home: TempDir,
    _project: TempDir,
    config: Config,
    project_dir: PathBuf,
    claude: FakeClaude,
    hooks: RecordingHook,
}

fn fixture() -> Fixture {
    let home = TempDir::new().expect("Failed to create temp dir");
    let project = TempDir::new().expect("Failed to create temp dir");
    let config = Config::with_home(home.path());
    let project_dir = project.path().canonicalize().unwrap();
    let claude = FakeClaude::new(config.claude.clone());
    Fixture {
        _home: home,
        _project: project,
        config,
        project_dir,
        claude,
        hooks: RecordingHook::default(),
    }
}

impl Fixture {
    fn reconciler(&self) -> Reconciler {
        Reconciler::new(&self.config, &self.project_dir)
            .with_installer(self.claude.clone())
            .with_hook_runner(self.hooks.clone())
    }

    fn write_profile(&self, name: &str, content: &str) {
        write(
            &self.config.user_profiles_dir().join(format!("{name}.json")),
            content,
        );
    }

    fn settings_path(&self, scope: Scope) -> PathBuf {
        self.config.claude.settings_path(scope, &self.project_dir)
    }

    fn write_settings(&self, scope: Scope, content: &str) {
        write(&self.settings_path(scope), content);
    }

    /// Enabled plugin keys at a scope, sorted
    fn enabled(&self, scope: Scope) -> Vec<String> {
        let path = self.settings_path(scope);
        if !path.exists() {
            return Vec::new();
        }
        let doc = read_json(&path);
        let mut keys: Vec<String> = doc["enabledPlugins"]
            .as_object()
            .map(|m| {
                m.iter()
                    .filter(|(_, v)| v.as_bool() == Some(true))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

const TEAM: &str = r#"{
    "name": "team",
    "marketplaces": [{"source": "github", "repo": "acme/m"}],
    "perScope": {
        "user": {"plugins": ["a@m"]},
        "project": {"plugins": ["b@m"]}
    }
}"#;

// =============================================================================
// Scope Merge Tests
// =============================================================================

#[test]
fn test_apply_writes_each_declared_scope() {
    let fx = fixture();
    fx.write_profile("team", TEAM);

    let report = fx
        .reconciler()
        .apply("team", ApplyOptions::default())
        .expect("apply failed");

    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
    assert_eq!(fx.enabled(Scope::Project), vec!["b@m"]);
    assert!(!fx.settings_path(Scope::Local).exists());
    assert!(report.changed);
    assert_eq!(report.failed_installs().count(), 0);

    let calls = fx.claude.calls();
    assert_eq!(calls[0], "marketplace acme/m");
    assert!(calls.contains(&"install a@m user".to_string()));
    assert!(calls.contains(&"install b@m project".to_string()));

    let crumb = fx
        .reconciler()
        .breadcrumbs()
        .get(Scope::User, &fx.project_dir)
        .expect("breadcrumb missing");
    assert_eq!(crumb.profile, "team");

    let pointer = ProjectPointer::require(&fx.project_dir).unwrap();
    assert_eq!(pointer.profile, "team");
    assert_eq!(pointer.profile_source, Some(ProfileSource::User));
}

#[test]
fn test_user_scope_keeps_extras_by_default() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    fx.write_settings(Scope::User, r#"{"enabledPlugins": {"x@m": true}, "theme": "dark"}"#);

    fx.reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap();

    assert_eq!(fx.enabled(Scope::User), vec!["a@m", "x@m"]);
    let doc = read_json(&fx.settings_path(Scope::User));
    assert_eq!(doc["theme"], "dark");
}

#[test]
fn test_replace_removes_user_extras() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    fx.write_settings(Scope::User, r#"{"enabledPlugins": {"x@m": true}}"#);

    let options = ApplyOptions {
        replace: true,
        ..ApplyOptions::default()
    };
    fx.reconciler().apply("team", options).unwrap();

    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
}

#[test]
fn test_extras_resolver_can_remove() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    fx.write_settings(Scope::User, r#"{"enabledPlugins": {"x@m": true}}"#);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let reconciler = fx
        .reconciler()
        .with_extras_resolver(move |scope: Scope, extras: &[PluginKey]| {
            recorded
                .lock()
                .unwrap()
                .push((scope, extras.to_vec()));
            ExtrasDecision::Remove
        });
    reconciler.apply("team", ApplyOptions::default()).unwrap();

    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert_eq!(seen[0], (Scope::User, vec![PluginKey::new("x", "m")]));
}

#[test]
fn test_project_scope_is_declarative() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    fx.write_settings(Scope::Project, r#"{"enabledPlugins": {"z@m": true}}"#);

    fx.reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap();

    assert_eq!(fx.enabled(Scope::Project), vec!["b@m"]);
}

#[test]
fn test_single_scope_leaves_other_scopes_untouched() {
    let fx = fixture();
    fx.write_profile("team", TEAM);

    let options = ApplyOptions {
        scope: Some(Scope::Project),
        ..ApplyOptions::default()
    };
    fx.reconciler().apply("team", options).unwrap();

    assert_eq!(fx.enabled(Scope::Project), vec!["b@m"]);
    assert!(!fx.settings_path(Scope::User).exists());
    assert!(!fx.claude.calls().contains(&"install a@m user".to_string()));

    let breadcrumbs = fx.reconciler();
    let breadcrumbs = breadcrumbs.breadcrumbs();
    assert!(breadcrumbs.get(Scope::User, &fx.project_dir).is_none());
    assert_eq!(
        breadcrumbs
            .get(Scope::Project, &fx.project_dir)
            .unwrap()
            .profile,
        "team"
    );
}

#[test]
fn test_undeclared_scope_is_not_found() {
    let fx = fixture();
    fx.write_profile("team", TEAM);

    let options = ApplyOptions {
        scope: Some(Scope::Local),
        ..ApplyOptions::default()
    };
    let err = fx.reconciler().apply("team", options).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[test]
fn test_legacy_profile_targets_requested_scope() {
    let fx = fixture();
    fx.write_profile("flat", r#"{"name": "flat", "plugins": ["a@m"]}"#);

    let options = ApplyOptions {
        scope: Some(Scope::Local),
        ..ApplyOptions::default()
    };
    fx.reconciler().apply("flat", options).unwrap();

    assert_eq!(fx.enabled(Scope::Local), vec!["a@m"]);
    assert!(!fx.settings_path(Scope::User).exists());
}

// =============================================================================
// Idempotence Tests
// =============================================================================

#[test]
fn test_second_apply_is_a_no_op() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    let reconciler = fx.reconciler();

    reconciler.apply("team", ApplyOptions::default()).unwrap();
    let calls = fx.claude.calls().len();
    let written = fs::metadata(fx.settings_path(Scope::User))
        .unwrap()
        .modified()
        .unwrap();

    let second = reconciler.apply("team", ApplyOptions::default()).unwrap();

    assert!(second.plan.is_empty(), "{}", second.plan.describe());
    assert!(second.plan.diff.is_empty());
    assert!(!second.changed);
    assert_eq!(fx.claude.calls().len(), calls);
    let rewritten = fs::metadata(fx.settings_path(Scope::User))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(written, rewritten);
}

#[test]
fn test_reinstall_reissues_installs() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    let reconciler = fx.reconciler();
    reconciler.apply("team", ApplyOptions::default()).unwrap();

    let options = ApplyOptions {
        reinstall: true,
        ..ApplyOptions::default()
    };
    let plan = reconciler
        .plan(
            &reconciler.store().load("team").unwrap(),
            ProfileSource::User,
            options,
        )
        .unwrap();

    let installs: Vec<&Action> = plan.installs().collect();
    assert_eq!(installs.len(), 2);
}

#[test]
fn test_apply_current_uses_breadcrumb() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    let reconciler = fx.reconciler();
    reconciler.apply("team", ApplyOptions::default()).unwrap();

    let report = reconciler.apply("current", ApplyOptions::default()).unwrap();
    assert_eq!(report.profile, "team");
    assert!(report.plan.is_empty());
}

#[test]
fn test_apply_current_without_breadcrumb_fails() {
    let fx = fixture();
    let err = fx
        .reconciler()
        .apply("current", ApplyOptions::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::NoActiveProfile(_)));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_install_is_not_enabled() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m", "bad@m"]}}}"#,
    );
    fx.claude.fail("bad@m");

    let err = fx
        .reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap_err();

    match err {
        CoreError::InstallFailure { failed } => {
            assert_eq!(failed.len(), 1);
            assert!(failed[0].starts_with("bad@m"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
    assert!(fx
        .reconciler()
        .breadcrumbs()
        .get(Scope::User, &fx.project_dir)
        .is_none());
}

#[test]
fn test_failed_install_keeps_report() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m", "bad@m"]}}}"#,
    );
    fx.claude.fail("bad@m");

    let attempt = fx
        .reconciler()
        .attempt_with("team", ApplyOptions::default(), |_| None)
        .expect("apply should reach execution");

    assert!(matches!(
        attempt.failure,
        Some(CoreError::InstallFailure { .. })
    ));
    let report = &attempt.report;
    assert_eq!(report.plan.installs().count(), 2);
    assert_eq!(report.installs.len(), 2);
    assert_eq!(report.failed_installs().count(), 1);
    assert!(report.changed);
}

#[test]
fn test_cancelled_apply_starts_no_installs() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m"]}}}"#,
    );
    let cancel = CancelToken::new();
    cancel.cancel();

    let attempt = fx
        .reconciler()
        .with_cancel_token(cancel)
        .attempt_with("team", ApplyOptions::default(), |_| None)
        .unwrap();

    assert!(fx.claude.calls().is_empty());
    assert_eq!(attempt.report.installs[0].result, Err("cancelled".to_string()));
    assert!(matches!(
        attempt.failure,
        Some(CoreError::InstallFailure { .. })
    ));
    assert!(fx.enabled(Scope::User).is_empty());
}

#[test]
fn test_malformed_settings_scope_is_overwritten() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {
            "user": {"plugins": ["a@m"]},
            "project": {"plugins": ["b@m"]}
        }}"#,
    );
    fx.write_settings(Scope::Project, "{not json");

    let report = fx
        .reconciler()
        .apply("team", ApplyOptions::default())
        .expect("a malformed scope file must not fail the apply");

    assert!(report.changed);
    assert_eq!(
        read_json(&fx.settings_path(Scope::Project)),
        json!({"enabledPlugins": {"b@m": true}})
    );
    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
}

#[test]
fn test_stack_with_scope_is_rejected() {
    let fx = fixture();
    fx.write_profile("base", r#"{"name": "base", "perScope": {"user": {"plugins": ["a@m"]}}}"#);
    fx.write_profile("stack", r#"{"name": "stack", "includes": ["base"]}"#);

    let options = ApplyOptions {
        scope: Some(Scope::User),
        ..ApplyOptions::default()
    };
    let err = fx.reconciler().apply("stack", options).unwrap_err();

    assert!(matches!(err, CoreError::StackWithScope(_)));
    assert!(fx.claude.calls().is_empty());
    assert!(!fx.settings_path(Scope::User).exists());
}

#[test]
fn test_stack_applies_included_plugins() {
    let fx = fixture();
    fx.write_profile("base", r#"{"name": "base", "perScope": {"user": {"plugins": ["a@m"]}}}"#);
    fx.write_profile(
        "extra",
        r#"{"name": "extra", "perScope": {"project": {"plugins": ["b@m"]}}}"#,
    );
    fx.write_profile("stack", r#"{"name": "stack", "includes": ["base", "extra"]}"#);

    fx.reconciler()
        .apply("stack", ApplyOptions::default())
        .unwrap();

    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
    assert_eq!(fx.enabled(Scope::Project), vec!["b@m"]);
}

#[test]
fn test_missing_profile_is_not_found() {
    let fx = fixture();
    let err = fx
        .reconciler()
        .apply("ghost", ApplyOptions::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::ProfileNotFound { .. }));
}

// =============================================================================
// Post-Apply Hook Tests
// =============================================================================

#[test]
fn test_hook_failure_after_settings_write() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m"]}},
            "postApply": {"command": "make setup"}}"#,
    );
    fx.hooks.fail.store(true, Ordering::SeqCst);

    let err = fx
        .reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap_err();

    assert!(matches!(err, CoreError::HookFailure { .. }));
    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
    assert_eq!(fx.hooks.count(), 1);
}

#[test]
fn test_on_change_hook_skipped_when_unchanged() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m"]}},
            "postApply": {"command": "make setup", "condition": "on-change"}}"#,
    );
    let reconciler = fx.reconciler();

    let first = reconciler.apply("team", ApplyOptions::default()).unwrap();
    assert_eq!(first.hook, Some(HookOutcome::Succeeded));

    let second = reconciler.apply("team", ApplyOptions::default()).unwrap();
    assert_eq!(second.hook, Some(HookOutcome::Skipped));
    assert_eq!(fx.hooks.count(), 1);
}

#[test]
fn test_always_hook_runs_on_empty_plan() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m"]}},
            "postApply": {"command": "make setup", "condition": "always"}}"#,
    );
    let reconciler = fx.reconciler();

    reconciler.apply("team", ApplyOptions::default()).unwrap();
    let second = reconciler.apply("team", ApplyOptions::default()).unwrap();

    assert!(second.plan.is_empty());
    assert_eq!(second.hook, Some(HookOutcome::Succeeded));
    assert_eq!(fx.hooks.count(), 2);
}

// =============================================================================
// Dry Run and Bootstrap Tests
// =============================================================================

#[test]
fn test_dry_run_writes_nothing() {
    let fx = fixture();
    fx.write_profile("team", TEAM);

    let options = ApplyOptions {
        dry_run: true,
        ..ApplyOptions::default()
    };
    let report = fx.reconciler().apply("team", options).unwrap();

    assert!(report.dry_run);
    assert!(!report.plan.is_empty());
    assert!(report.installs.is_empty());
    assert!(fx.claude.calls().is_empty());
    assert!(!fx.settings_path(Scope::User).exists());
    assert!(!fx.settings_path(Scope::Project).exists());
    assert!(!ProjectPointer::path(&fx.project_dir).exists());
    assert!(!fx.config.breadcrumb_path().exists());
}

#[test]
fn test_bootstrap_snapshots_missing_profile() {
    let fx = fixture();
    fx.write_settings(Scope::User, r#"{"enabledPlugins": {"a@m": true}}"#);
    fx.claude
        .install_plugin(&PluginKey::new("a", "m"), Scope::User, &fx.project_dir)
        .unwrap();

    let options = ApplyOptions {
        bootstrap: true,
        ..ApplyOptions::default()
    };
    let reconciler = fx.reconciler();
    let report = reconciler.apply("fresh", options).unwrap();

    assert!(report.bootstrapped);
    assert_eq!(report.plan.installs().count(), 0);
    let saved = reconciler.store().load("fresh").unwrap();
    assert_eq!(
        saved.scope(Scope::User).plugins.sorted(),
        vec![PluginKey::new("a", "m")]
    );
    assert_eq!(fx.enabled(Scope::User), vec!["a@m"]);
}

#[test]
fn test_bootstrap_rejects_invalid_name() {
    let fx = fixture();
    let options = ApplyOptions {
        bootstrap: true,
        ..ApplyOptions::default()
    };
    let err = fx.reconciler().apply("team/", options).unwrap_err();
    assert!(matches!(err, CoreError::InvalidName { .. }));
}

// =============================================================================
// MCP Server Tests
// =============================================================================

#[test]
fn test_mcp_servers_written_per_scope() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {
            "project": {"plugins": [], "mcpServers": [{"name": "db", "command": "pg-mcp"}]},
            "local": {"plugins": [], "mcpServers": [{"name": "notes", "command": "notes-mcp"}]}
        }}"#,
    );
    write(
        &fx.config.claude.claude_json,
        r#"{"numStartups": 3, "mcpServers": {"keep": {"command": "k"}}}"#,
    );

    fx.reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap();

    let project = read_json(&fx.project_dir.join(".mcp.json"));
    assert_eq!(project["mcpServers"]["db"]["command"], "pg-mcp");

    let claude_json = read_json(&fx.config.claude.claude_json);
    let key = fx.project_dir.to_string_lossy().into_owned();
    assert_eq!(
        claude_json["projects"][key.as_str()]["mcpServers"]["notes"]["command"],
        "notes-mcp"
    );
    assert_eq!(claude_json["numStartups"], 3);
    assert_eq!(claude_json["mcpServers"]["keep"]["command"], "k");
}

#[test]
fn test_mcp_server_fields_survive_apply() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"project": {"plugins": [], "mcpServers": [
            {"name": "api", "type": "http", "url": "https://api.example.com/mcp",
             "headers": {"Authorization": "Bearer t"}, "timeout": 30000}
        ]}}}"#,
    );

    fx.reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap();

    let project = read_json(&fx.project_dir.join(".mcp.json"));
    let api = &project["mcpServers"]["api"];
    assert_eq!(api["headers"]["Authorization"], "Bearer t");
    assert_eq!(api["timeout"], 30000);
    assert!(api.get("name").is_none());

    let second = fx
        .reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap();
    assert!(second
        .plan
        .actions
        .iter()
        .all(|a| !matches!(a, Action::WriteMcpServers { .. })));
}

#[test]
fn test_replace_removes_undeclared_servers() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {
            "project": {"plugins": [], "mcpServers": [{"name": "db", "command": "pg-mcp"}]}
        }}"#,
    );
    write(
        &fx.project_dir.join(".mcp.json"),
        r#"{"mcpServers": {"old": {"command": "old-mcp"}}}"#,
    );

    let reconciler = fx.reconciler();
    reconciler.apply("team", ApplyOptions::default()).unwrap();
    let project = read_json(&fx.project_dir.join(".mcp.json"));
    assert!(project["mcpServers"].get("old").is_some());

    let options = ApplyOptions {
        replace: true,
        ..ApplyOptions::default()
    };
    reconciler.apply("team", options).unwrap();
    let project = read_json(&fx.project_dir.join(".mcp.json"));
    assert!(project["mcpServers"].get("old").is_none());
    assert!(project["mcpServers"].get("db").is_some());
}

// =============================================================================
// Pointer Tests
// =============================================================================

#[test]
fn test_pointer_only_written_for_project_scope() {
    let fx = fixture();
    fx.write_profile("solo", r#"{"name": "solo", "perScope": {"user": {"plugins": ["a@m"]}}}"#);

    fx.reconciler()
        .apply("solo", ApplyOptions::default())
        .unwrap();

    assert!(!ProjectPointer::path(&fx.project_dir).exists());
}

#[test]
fn test_pointer_drops_legacy_list_on_repoint() {
    let fx = fixture();
    fx.write_profile("team", TEAM);
    write(
        &ProjectPointer::path(&fx.project_dir),
        r#"{"version": "1", "profile": "old", "plugins": ["x@m"]}"#,
    );

    fx.reconciler()
        .apply("team", ApplyOptions::default())
        .unwrap();

    let pointer = ProjectPointer::require(&fx.project_dir).unwrap();
    assert_eq!(pointer.profile, "team");
    assert!(pointer.plugins.is_none());
}
