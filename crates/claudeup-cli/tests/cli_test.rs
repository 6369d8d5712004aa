//! CLI integration tests using assert_cmd
//!
//! These tests run the claudeup binary against a temporary home and
//! project directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    home: TempDir,
    project: TempDir,
}

fn fixture() -> Fixture {
    Fixture {
        home: TempDir::new().expect("Failed to create temp dir"),
        project: TempDir::new().expect("Failed to create temp dir"),
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create dir");
    fs::write(path, content).expect("Failed to write");
}

impl Fixture {
    /// Get a command instance for the claudeup binary, isolated to this fixture
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("claudeup").expect("Failed to find claudeup binary");
        cmd.env("HOME", self.home.path())
            .env("CLAUDE_CONFIG_DIR", self.claude_dir())
            .env("CLAUDEUP_HOME", self.home.path().join(".claudeup"))
            .env_remove("CLAUDEUP_LOG")
            .current_dir(self.project.path());
        cmd
    }

    fn claude_dir(&self) -> PathBuf {
        self.home.path().join(".claude")
    }

    fn write_user_settings(&self, content: &str) {
        write(&self.claude_dir().join("settings.json"), content);
    }

    fn write_project_settings(&self, content: &str) {
        write(
            &self.project.path().join(".claude").join("settings.json"),
            content,
        );
    }

    fn write_profile(&self, name: &str, content: &str) {
        write(
            &self
                .home
                .path()
                .join(".claudeup")
                .join("profiles")
                .join(format!("{name}.json")),
            content,
        );
    }

    fn pointer_path(&self) -> PathBuf {
        self.project.path().join(".claudeup.json")
    }
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    fixture()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "claudeup - Claude Code profile manager",
        ));
}

#[test]
fn test_version_command() {
    fixture()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("claudeup"));
}

#[test]
fn test_profile_help() {
    fixture()
        .cmd()
        .args(["profile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manage and apply profiles"));
}

#[test]
fn test_apply_help_lists_flags() {
    fixture()
        .cmd()
        .args(["profile", "apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--replace"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--bootstrap"));
}

#[test]
fn test_conflicting_scope_flags_rejected() {
    fixture()
        .cmd()
        .args(["profile", "apply", "team", "--user", "--project"])
        .assert()
        .failure();
}

// =============================================================================
// Profile Command Tests
// =============================================================================

#[test]
fn test_profile_list_empty() {
    fixture()
        .cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles found."));
}

#[test]
fn test_profile_save_then_list_and_show() {
    let fx = fixture();
    fx.write_user_settings(r#"{"enabledPlugins": {"a@m": true}}"#);

    fx.cmd()
        .args(["-y", "profile", "save", "team", "-d", "Team setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved profile 'team (user)'"));

    fx.cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("team [user] - Team setup"));

    fx.cmd()
        .args(["profile", "show", "team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kind: per-scope"))
        .stdout(predicate::str::contains("user scope:"))
        .stdout(predicate::str::contains("a@m"));
}

#[test]
fn test_save_reserved_name_fails() {
    fixture()
        .cmd()
        .args(["-y", "profile", "save", "current"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved name"));
}

#[test]
fn test_apply_missing_profile_suggests_list() {
    fixture()
        .cmd()
        .args(["-y", "profile", "apply", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile 'ghost' not found"))
        .stderr(predicate::str::contains("Try: claudeup profile list"));
}

#[test]
fn test_apply_dry_run_writes_nothing() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m"]}}}"#,
    );

    fx.cmd()
        .args(["-y", "profile", "apply", "team", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a@m"))
        .stdout(predicate::str::contains("Dry run - no changes made."));

    assert!(!fx.claude_dir().join("settings.json").exists());
    assert!(!fx.pointer_path().exists());
}

#[test]
fn test_failed_apply_still_prints_report() {
    let fx = fixture();
    write(
        &fx.home.path().join(".claudeup").join("config.json"),
        r#"{"claudeBin": "claudeup-test-no-such-claude"}"#,
    );
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m"]}}}"#,
    );

    fx.cmd()
        .args(["-y", "profile", "apply", "team"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Applying 'team'"))
        .stdout(predicate::str::contains("✗ a@m (user scope)"))
        .stdout(predicate::str::contains("Applied profile").not())
        .stderr(predicate::str::contains("1 install(s) failed"));

    assert!(!fx.claude_dir().join("settings.json").exists());
}

#[test]
fn test_diff_against_matching_live_state() {
    let fx = fixture();
    fx.write_user_settings(r#"{"enabledPlugins": {"a@m": true}}"#);
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"user": {"plugins": ["a@m"]}}}"#,
    );

    fx.cmd()
        .args(["profile", "diff", "team", "--user"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No differences."));
}

#[test]
fn test_diff_two_profiles() {
    let fx = fixture();
    fx.write_profile(
        "a",
        r#"{"name": "a", "perScope": {"user": {"plugins": ["x@m"]}}}"#,
    );
    fx.write_profile(
        "b",
        r#"{"name": "b", "perScope": {"user": {"plugins": ["y@m"]}}}"#,
    );

    fx.cmd()
        .args(["profile", "diff", "a", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- x@m (user scope)"))
        .stdout(predicate::str::contains("+ y@m (user scope)"));
}

#[test]
fn test_current_without_breadcrumb() {
    fixture()
        .cmd()
        .args(["profile", "current"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profile applied"));
}

#[test]
fn test_delete_with_yes() {
    let fx = fixture();
    fx.write_profile("old", r#"{"name": "old", "perScope": {}}"#);

    fx.cmd()
        .args(["-y", "profile", "delete", "old"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted profile 'old (user)'"));

    fx.cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles found."));
}

// =============================================================================
// Status and Scope Tests
// =============================================================================

#[test]
fn test_status_reports_uninstalled_plugins() {
    let fx = fixture();
    fx.write_user_settings(r#"{"enabledPlugins": {"a@m": true}}"#);

    fx.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active profile: none"))
        .stdout(predicate::str::contains("a@m (not installed)"));
}

#[test]
fn test_status_json() {
    let fx = fixture();
    fx.write_project_settings(r#"{"enabledPlugins": {"b@m": true}}"#);

    let output = fx.cmd().args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["uniquePlugins"], 1);
    assert_eq!(value["scopes"]["project"]["plugins"][0]["key"], "b@m");
}

#[test]
fn test_scopes_diff() {
    let fx = fixture();
    fx.write_user_settings(r#"{"enabledPlugins": {"a@m": true}}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"b@m": true}}"#);

    fx.cmd()
        .args(["scopes", "diff", "user", "project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- a@m (user scope)"))
        .stdout(predicate::str::contains("+ b@m (project scope)"));
}

// =============================================================================
// Drift Tests
// =============================================================================

#[test]
fn test_drift_without_pointer_fails() {
    fixture()
        .cmd()
        .arg("drift")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .claudeup.json found"));
}

#[test]
fn test_drift_reports_and_cleans_missing_entry() {
    let fx = fixture();
    write(
        &fx.pointer_path(),
        r#"{"version": "1", "profile": "team", "plugins": ["x@m", "y@m"]}"#,
    );
    fx.write_project_settings(r#"{"enabledPlugins": {"x@m": true}}"#);

    fx.cmd()
        .arg("drift")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing y@m (project scope)"));

    fx.cmd()
        .args(["-y", "drift", "clean", "y@m", "--scope", "project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed y@m from .claudeup.json"));

    let pointer = fs::read_to_string(fx.pointer_path()).unwrap();
    assert!(!pointer.contains("y@m"));
    fx.cmd()
        .arg("drift")
        .assert()
        .success()
        .stdout(predicate::str::contains("No drift detected."));
}

#[test]
fn test_drift_clean_unknown_entry_fails() {
    let fx = fixture();
    write(&fx.pointer_path(), r#"{"profile": "team", "plugins": []}"#);

    fx.cmd()
        .args(["-y", "drift", "clean", "z@m"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Drift entry 'z@m (project scope)' not found"));
}
