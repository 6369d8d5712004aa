//! Drift detection tests
//!
//! Tests for comparing the project pointer against live project settings
//! and cleaning up single orphaned entries.

use claudeup_core::claudeup_live::{PluginKey, Scope};
use claudeup_core::drift::DeclaredSource;
use claudeup_core::pointer::ProjectPointer;
use claudeup_core::{Config, CoreError, DriftDetector, DriftKind, ProfileStore};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create dir");
    fs::write(path, content).expect("Failed to write");
}

struct Fixture {
    _home: TempDir,
    _project: TempDir,
    config: Config,
    project_dir: PathBuf,
}

fn fixture() -> Fixture {
    let home = TempDir::new().expect("Failed to create temp dir");
    let project = TempDir::new().expect("Failed to create temp dir");
    let config = Config::with_home(home.path());
    let project_dir = project.path().canonicalize().unwrap();
    Fixture {
        _home: home,
        _project: project,
        config,
        project_dir,
    }
}

impl Fixture {
    fn detector(&self) -> DriftDetector {
        DriftDetector::new(&self.config, &self.project_dir)
    }

    fn store(&self) -> ProfileStore {
        ProfileStore::from_config(&self.config, &self.project_dir)
    }

    fn write_pointer(&self, content: &str) {
        write(&ProjectPointer::path(&self.project_dir), content);
    }

    fn write_project_settings(&self, content: &str) {
        write(
            &self.config.claude.settings_path(Scope::Project, &self.project_dir),
            content,
        );
    }

    fn write_profile(&self, name: &str, content: &str) {
        write(
            &self.config.user_profiles_dir().join(format!("{name}.json")),
            content,
        );
    }

    fn project_settings(&self) -> Value {
        let path = self.config.claude.settings_path(Scope::Project, &self.project_dir);
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }
}

fn key(s: &str) -> PluginKey {
    s.parse().unwrap()
}

// =============================================================================
// Detection Tests
// =============================================================================

#[test]
fn test_missing_entry_from_legacy_pointer_list() {
    let fx = fixture();
    fx.write_pointer(r#"{"version": "1", "profile": "team", "plugins": ["x@m", "y@m"]}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"x@m": true}}"#);

    let report = fx.detector().detect().unwrap();

    assert_eq!(report.declared_from, DeclaredSource::PointerList);
    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.key, key("y@m"));
    assert_eq!(entry.kind, DriftKind::Missing);
    assert_eq!(entry.scope, Scope::Project);
    assert!(!entry.also_in_profile);
}

#[test]
fn test_untracked_entry_against_saved_profile() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"project": {"plugins": ["a@m"]}}}"#,
    );
    fx.write_pointer(r#"{"version": "1", "profile": "team", "profileSource": "user"}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"a@m": true, "z@m": true}}"#);

    let report = fx.detector().detect().unwrap();

    assert_eq!(report.declared_from, DeclaredSource::Profile);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].key, key("z@m"));
    assert_eq!(report.entries[0].kind, DriftKind::Untracked);
}

#[test]
fn test_disabled_entries_are_not_drift() {
    let fx = fixture();
    fx.write_pointer(r#"{"profile": "team", "plugins": ["x@m"]}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"x@m": true, "off@m": false}}"#);

    let report = fx.detector().detect().unwrap();
    assert!(!report.has_drift());
}

#[test]
fn test_pointer_list_annotated_with_profile() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"project": {"plugins": ["a@m", "z@m"]}}}"#,
    );
    fx.write_pointer(r#"{"profile": "team", "plugins": ["a@m"]}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"a@m": true, "z@m": true}}"#);

    let report = fx.detector().detect().unwrap();

    let entry = report.entry(&key("z@m")).expect("z@m should drift");
    assert_eq!(entry.kind, DriftKind::Untracked);
    assert!(entry.also_in_profile);
    assert_eq!(entry.to_string(), "untracked z@m (project scope) (also in profile)");
}

#[test]
fn test_no_pointer_is_an_error() {
    let fx = fixture();
    let err = fx.detector().detect().unwrap_err();
    assert!(matches!(err, CoreError::NoPointer(_)));
}

#[test]
fn test_unknown_profile_declares_nothing() {
    let fx = fixture();
    fx.write_pointer(r#"{"profile": "ghost"}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"a@m": true}}"#);

    let report = fx.detector().detect().unwrap();

    assert_eq!(report.declared_from, DeclaredSource::Nothing);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].kind, DriftKind::Untracked);
}

// =============================================================================
// Cleanup Tests
// =============================================================================

#[test]
fn test_clean_missing_touches_only_that_entry() {
    let fx = fixture();
    fx.write_pointer(r#"{"version": "1", "profile": "team", "plugins": ["x@m", "y@m"]}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"x@m": true}}"#);
    let detector = fx.detector();
    let report = detector.detect().unwrap();

    let outcome = detector.clean(&report.entries[0], false).unwrap();

    assert!(outcome.pointer);
    assert!(!outcome.live);
    assert!(!outcome.profile);
    let pointer = ProjectPointer::require(&fx.project_dir).unwrap();
    assert_eq!(pointer.plugins, Some(vec![key("x@m")]));
    assert_eq!(fx.project_settings()["enabledPlugins"]["x@m"], true);
    assert!(!detector.detect().unwrap().has_drift());
}

#[test]
fn test_clean_untracked_removes_live_entry() {
    let fx = fixture();
    fx.write_pointer(r#"{"profile": "team", "plugins": ["a@m"]}"#);
    fx.write_project_settings(
        r#"{"enabledPlugins": {"a@m": true, "z@m": true}, "permissions": {"allow": []}}"#,
    );
    let detector = fx.detector();
    let report = detector.detect().unwrap();
    let entry = report.entry(&key("z@m")).unwrap();

    let outcome = detector.clean(entry, false).unwrap();

    assert!(outcome.live);
    let settings = fx.project_settings();
    assert!(settings["enabledPlugins"].get("z@m").is_none());
    assert_eq!(settings["enabledPlugins"]["a@m"], true);
    assert!(settings.get("permissions").is_some());
}

#[test]
fn test_clean_also_profile_edits_saved_profile() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"project": {"plugins": ["a@m", "q@m"]}}}"#,
    );
    fx.write_pointer(r#"{"profile": "team", "profileSource": "user"}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"a@m": true}}"#);
    let detector = fx.detector();
    let report = detector.detect().unwrap();
    let entry = report.entry(&key("q@m")).unwrap();
    assert_eq!(entry.kind, DriftKind::Missing);
    assert!(entry.also_in_profile);

    let outcome = detector.clean(entry, true).unwrap();

    assert!(outcome.profile);
    let saved = fx.store().load("team").unwrap();
    assert_eq!(saved.scope(Scope::Project).plugins.sorted(), vec![key("a@m")]);
    assert!(!detector.detect().unwrap().has_drift());
}

#[test]
fn test_clean_without_also_profile_keeps_profile() {
    let fx = fixture();
    fx.write_profile(
        "team",
        r#"{"name": "team", "perScope": {"project": {"plugins": ["a@m", "z@m"]}}}"#,
    );
    fx.write_pointer(r#"{"profile": "team", "plugins": ["a@m"]}"#);
    fx.write_project_settings(r#"{"enabledPlugins": {"a@m": true, "z@m": true}}"#);
    let detector = fx.detector();
    let report = detector.detect().unwrap();

    detector
        .clean(report.entry(&key("z@m")).unwrap(), false)
        .unwrap();

    let saved = fx.store().load("team").unwrap();
    assert_eq!(saved.scope(Scope::Project).plugins.len(), 2);
}
