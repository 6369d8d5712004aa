//! Marketplace and plugin installation
//!
//! The actual install mechanics belong to the Claude Code CLI; this module
//! only decides what to ask for and runs the requests on a bounded worker
//! pool. One failed item never stops its siblings.

use rayon::prelude::*;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use claudeup_live::{PluginKey, Scope};

use crate::config::Config;
use crate::profile::Marketplace;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag that stops new installs from being issued
///
/// Installs already running are left to finish or fail on their own.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Something to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    Marketplace(Marketplace),
    Plugin { key: PluginKey, scope: Scope },
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marketplace(m) => write!(f, "marketplace {}", m.repo),
            Self::Plugin { key, scope } => write!(f, "{key} ({scope} scope)"),
        }
    }
}

/// Result of one install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub target: InstallTarget,
    /// `Err` carries the installer's message
    pub result: Result<(), String>,
}

impl InstallOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Performs installs on behalf of the reconciler
///
/// Implementations must be safe to call from several worker threads.
pub trait Installer: Send + Sync {
    /// Register a marketplace
    fn add_marketplace(&self, marketplace: &Marketplace) -> Result<(), String>;

    /// Install a plugin at a scope, running in `project_dir`
    fn install_plugin(&self, key: &PluginKey, scope: Scope, project_dir: &Path)
        -> Result<(), String>;
}

/// Installer that shells out to the `claude` CLI
#[derive(Debug, Clone)]
pub struct ClaudeCliInstaller {
    bin: String,
    timeout: Duration,
}

impl ClaudeCliInstaller {
    #[must_use]
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.claude_bin.clone(), config.install_timeout)
    }
}

impl Installer for ClaudeCliInstaller {
    fn add_marketplace(&self, marketplace: &Marketplace) -> Result<(), String> {
        let mut command = Command::new(&self.bin);
        command.args(["plugin", "marketplace", "add", marketplace.repo.as_str()]);
        run_command(command, self.timeout)
    }

    fn install_plugin(
        &self,
        key: &PluginKey,
        scope: Scope,
        project_dir: &Path,
    ) -> Result<(), String> {
        let mut command = Command::new(&self.bin);
        command
            .args(["plugin", "install", &key.to_string(), "--scope", scope.as_str()])
            .current_dir(project_dir);
        run_command(command, self.timeout)
    }
}

/// Run a command to completion, killing it after `timeout`
///
/// Stderr is captured through a temporary file so a chatty child can
/// never block on a full pipe.
pub(crate) fn run_command(mut command: Command, timeout: Duration) -> Result<(), String> {
    let mut stderr = tempfile::tempfile().map_err(|e| format!("cannot capture output: {e}"))?;
    let stderr_handle = stderr
        .try_clone()
        .map_err(|e| format!("cannot capture output: {e}"))?;

    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_handle))
        .spawn()
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {}s", timeout.as_secs()));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(format!("failed to wait for {program}: {e}")),
        }
    };

    if status.success() {
        return Ok(());
    }

    let mut message = String::new();
    if stderr.seek(SeekFrom::Start(0)).is_ok() {
        let _ = stderr.read_to_string(&mut message);
    }
    let message = message.trim();
    Err(match (status.code(), message.is_empty()) {
        (Some(code), true) => format!("exited with status {code}"),
        (Some(code), false) => format!("exited with status {code}: {message}"),
        (None, _) => "terminated by signal".to_string(),
    })
}

/// Run install requests on at most `max_parallel` workers
///
/// Outcomes are returned in request order. Once `cancel` fires, items not
/// yet started are reported as cancelled.
pub fn run_installs(
    installer: &dyn Installer,
    targets: &[InstallTarget],
    project_dir: &Path,
    max_parallel: usize,
    cancel: &CancelToken,
) -> Vec<InstallOutcome> {
    if targets.is_empty() {
        return Vec::new();
    }
    let project_dir: PathBuf = project_dir.to_path_buf();

    let install = |target: &InstallTarget| {
        let result = if cancel.is_cancelled() {
            Err("cancelled".to_string())
        } else {
            match target {
                InstallTarget::Marketplace(m) => installer.add_marketplace(m),
                InstallTarget::Plugin { key, scope } => {
                    installer.install_plugin(key, *scope, &project_dir)
                }
            }
        };
        match &result {
            Ok(()) => tracing::info!("Installed {target}"),
            Err(e) => tracing::warn!("Failed to install {target}: {e}"),
        }
        InstallOutcome {
            target: target.clone(),
            result,
        }
    };

    match rayon::ThreadPoolBuilder::new()
        .num_threads(max_parallel.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| targets.par_iter().map(install).collect()),
        Err(e) => {
            tracing::debug!("Falling back to sequential installs: {e}");
            targets.iter().map(install).collect()
        }
    }
}
