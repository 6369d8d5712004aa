//! CLI command handlers

pub mod drift;
pub mod profile;
pub mod prompt;
pub mod scopes;
pub mod status;

use anyhow::Context as _;
use clap::Args;
use std::path::PathBuf;

use claudeup_core::claudeup_live::paths::canonical_project_dir;
use claudeup_core::claudeup_live::{LiveState, Scope};
use claudeup_core::profile::ProfileLocation;
use claudeup_core::{BreadcrumbStore, Config, ProfileStore};

/// Picks one of several ambiguous profile locations
pub type Chooser = fn(&[ProfileLocation]) -> Option<usize>;

/// Everything a command needs about its environment
pub struct Context {
    pub config: Config,
    /// Canonical working directory
    pub project_dir: PathBuf,
    /// `-y` was given
    pub assume_yes: bool,
}

impl Context {
    pub fn load(assume_yes: bool) -> anyhow::Result<Self> {
        let config = Config::load()?;
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let project_dir = canonical_project_dir(&cwd)?;
        tracing::debug!("Project directory: {}", project_dir.display());
        Ok(Self {
            config,
            project_dir,
            assume_yes,
        })
    }

    pub fn store(&self) -> ProfileStore {
        ProfileStore::from_config(&self.config, &self.project_dir)
    }

    pub fn breadcrumbs(&self) -> BreadcrumbStore {
        BreadcrumbStore::from(&self.config)
    }

    pub fn live(&self) -> LiveState {
        LiveState::load(&self.config.claude, &self.project_dir)
    }

    /// Ambiguity prompt, or none under `-y`
    pub fn chooser(&self) -> Chooser {
        if self.assume_yes {
            |_| None
        } else {
            prompt::choose_location
        }
    }

    /// Ask a yes/no question, or answer yes under `-y`
    pub fn confirm(&self, question: &str) -> bool {
        self.assume_yes || prompt::confirm(question)
    }
}

pub(crate) fn parse_scope(value: &str) -> Result<Scope, String> {
    value.parse::<Scope>().map_err(|e| e.to_string())
}

/// Scope selection shared by several commands
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(multiple = false)]
pub struct ScopeArgs {
    /// Target scope (user, project, local)
    #[arg(long, value_parser = parse_scope)]
    pub scope: Option<Scope>,
    /// Shorthand for --scope user
    #[arg(long)]
    pub user: bool,
    /// Shorthand for --scope project
    #[arg(long)]
    pub project: bool,
    /// Shorthand for --scope local
    #[arg(long)]
    pub local: bool,
}

impl ScopeArgs {
    pub fn selected(&self) -> Option<Scope> {
        if self.user {
            Some(Scope::User)
        } else if self.project {
            Some(Scope::Project)
        } else if self.local {
            Some(Scope::Local)
        } else {
            self.scope
        }
    }
}
