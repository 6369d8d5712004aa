//! Post-apply hook execution

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::install::run_command;

/// Runs a profile's post-apply command
pub trait HookRunner {
    /// Run `command` with `project_dir` as working directory
    fn run(&self, command: &str, project_dir: &Path) -> Result<(), String>;
}

/// Runs hooks through `sh -c`
#[derive(Debug, Clone)]
pub struct ShellHookRunner {
    timeout: Duration,
}

impl ShellHookRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HookRunner for ShellHookRunner {
    fn run(&self, command: &str, project_dir: &Path) -> Result<(), String> {
        tracing::info!("Running post-apply hook: {command}");
        let mut shell = Command::new("sh");
        shell.args(["-c", command]).current_dir(project_dir);
        run_command(shell, self.timeout)
    }
}

/// What happened to the post-apply hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Condition not met (on-change with nothing changed)
    Skipped,
    Succeeded,
    Failed(String),
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hook_runs_in_project_dir() {
        let temp = TempDir::new().unwrap();
        let runner = ShellHookRunner::new(Duration::from_secs(10));
        runner.run("touch marker", temp.path()).unwrap();
        assert!(temp.path().join("marker").exists());
    }

    #[test]
    fn test_hook_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let runner = ShellHookRunner::new(Duration::from_secs(10));
        let err = runner.run("exit 2", temp.path()).unwrap_err();
        assert!(err.contains("status 2"));
    }
}
