//! Reconciler - converge live state to a profile
//!
//! Merge policy per scope:
//! - user scope is additive: extras (enabled live, not declared) stay
//!   unless `replace` is set or the [`ExtrasResolver`] chooses removal;
//! - project and local scopes are declarative: the written
//!   `enabledPlugins` is exactly the declared set.
//!
//! Every apply re-reads live state and rebuilds its plan right before
//! executing, so an unchanged system yields an empty plan and no writes.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use claudeup_live::{LiveState, McpServer, PluginKey, Scope};

use crate::breadcrumb::BreadcrumbStore;
use crate::config::Config;
use crate::diff::{diff, ConfigSnapshot, DiffOptions};
use crate::error::{CoreError, CoreResult};
use crate::pointer::ProjectPointer;
use crate::profile::{
    snapshot_live, PostApplyHook, Profile, ProfileLocation, ProfileSource, ProfileStore,
    ScopeSettings,
};
use crate::resolve::{load_composed, resolve_reference, target_scopes};
use crate::util::{validate_profile_name, write_json_atomic};

use super::hook::{HookOutcome, HookRunner, ShellHookRunner};
use super::install::{
    run_installs, CancelToken, ClaudeCliInstaller, InstallOutcome, InstallTarget, Installer,
};
use super::plan::{Action, ActionPlan};
use super::write::{mcp_document, preview, settings_document};

/// What to do with user-scope extras
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrasDecision {
    /// Leave them enabled (additive)
    Keep,
    /// Remove them from the settings file
    Remove,
}

/// Decides the fate of user-scope extras when `replace` is not set
pub trait ExtrasResolver {
    fn resolve_extras(&self, scope: Scope, extras: &[PluginKey]) -> ExtrasDecision;
}

/// Strategy for `-y` and CI: always keep extras
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl ExtrasResolver for NonInteractive {
    fn resolve_extras(&self, _scope: Scope, _extras: &[PluginKey]) -> ExtrasDecision {
        ExtrasDecision::Keep
    }
}

impl<F> ExtrasResolver for F
where
    F: Fn(Scope, &[PluginKey]) -> ExtrasDecision,
{
    fn resolve_extras(&self, scope: Scope, extras: &[PluginKey]) -> ExtrasDecision {
        self(scope, extras)
    }
}

/// Apply options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Restrict the apply to one scope (rejected for stacks)
    pub scope: Option<Scope>,
    /// Make user scope declarative too and remove undeclared MCP servers
    pub replace: bool,
    /// Reinstall plugins that are already installed
    pub reinstall: bool,
    /// Build the plan without executing it
    pub dry_run: bool,
    /// Snapshot live state into a missing profile instead of failing
    pub bootstrap: bool,
}

/// Result of an apply
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub profile: String,
    pub source: ProfileSource,
    pub plan: ActionPlan,
    /// Per-item install results (empty for dry runs)
    pub installs: Vec<InstallOutcome>,
    pub hook: Option<HookOutcome>,
    /// Whether any file was written or anything installed
    pub changed: bool,
    pub dry_run: bool,
    /// Whether the profile was created from live state
    pub bootstrapped: bool,
}

impl ApplyReport {
    fn new(profile: &str, source: ProfileSource, plan: ActionPlan, dry_run: bool) -> Self {
        Self {
            profile: profile.to_string(),
            source,
            plan,
            installs: Vec::new(),
            hook: None,
            changed: false,
            dry_run,
            bootstrapped: false,
        }
    }

    pub fn failed_installs(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.installs.iter().filter(|o| !o.succeeded())
    }
}

/// An apply that reached execution, with the failure that ended it
///
/// Install and hook failures surface after settings may already have been
/// written, so the report travels alongside the error.
#[derive(Debug)]
pub struct ApplyAttempt {
    pub report: ApplyReport,
    pub failure: Option<CoreError>,
}

impl ApplyAttempt {
    fn finished(report: ApplyReport) -> Self {
        Self {
            report,
            failure: None,
        }
    }

    pub fn into_result(self) -> CoreResult<ApplyReport> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }
}

/// The apply engine
pub struct Reconciler {
    config: Config,
    project_dir: PathBuf,
    store: ProfileStore,
    breadcrumbs: BreadcrumbStore,
    installer: Box<dyn Installer>,
    hooks: Box<dyn HookRunner>,
    extras: Box<dyn ExtrasResolver>,
    cancel: CancelToken,
}

impl Reconciler {
    /// Reconciler for a canonical project directory, with the production
    /// installer and hook runner and non-interactive extras handling
    #[must_use]
    pub fn new(config: &Config, project_dir: &Path) -> Self {
        Self {
            config: config.clone(),
            project_dir: project_dir.to_path_buf(),
            store: ProfileStore::from_config(config, project_dir),
            breadcrumbs: BreadcrumbStore::from(config),
            installer: Box::new(ClaudeCliInstaller::from_config(config)),
            hooks: Box::new(ShellHookRunner::new(config.install_timeout)),
            extras: Box::new(NonInteractive),
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_installer(mut self, installer: impl Installer + 'static) -> Self {
        self.installer = Box::new(installer);
        self
    }

    #[must_use]
    pub fn with_hook_runner(mut self, hooks: impl HookRunner + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    #[must_use]
    pub fn with_extras_resolver(mut self, extras: impl ExtrasResolver + 'static) -> Self {
        self.extras = Box::new(extras);
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn breadcrumbs(&self) -> &BreadcrumbStore {
        &self.breadcrumbs
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Fresh read of live state
    pub fn live(&self) -> LiveState {
        LiveState::load(&self.config.claude, &self.project_dir)
    }

    /// Apply a profile by reference (`current` allowed)
    pub fn apply(&self, reference: &str, options: ApplyOptions) -> CoreResult<ApplyReport> {
        self.apply_with(reference, options, |_| None)
    }

    /// Apply a profile, letting `choose` disambiguate the reference
    pub fn apply_with<F>(
        &self,
        reference: &str,
        options: ApplyOptions,
        choose: F,
    ) -> CoreResult<ApplyReport>
    where
        F: FnOnce(&[ProfileLocation]) -> Option<usize>,
    {
        self.attempt_with(reference, options, choose)?.into_result()
    }

    /// Like [`Reconciler::apply_with`], but failures that happen while
    /// executing keep the report of what was already done
    ///
    /// The outer error covers failures before anything was executed.
    pub fn attempt_with<F>(
        &self,
        reference: &str,
        options: ApplyOptions,
        choose: F,
    ) -> CoreResult<ApplyAttempt>
    where
        F: FnOnce(&[ProfileLocation]) -> Option<usize>,
    {
        let name = resolve_reference(reference, &self.breadcrumbs, &self.project_dir, None)?;
        match load_composed(&self.store, &name, choose) {
            Ok((location, profile)) => self.attempt_profile(&profile, location.source, options),
            Err(CoreError::ProfileNotFound { .. }) if options.bootstrap => {
                self.bootstrap(&name, options)
            }
            Err(e) => Err(e),
        }
    }

    fn bootstrap(&self, name: &str, options: ApplyOptions) -> CoreResult<ApplyAttempt> {
        validate_profile_name(name)?;
        let profile = snapshot_live(name, &self.live());
        tracing::info!("Bootstrapping profile '{name}' from live state");
        if !options.dry_run {
            self.store.save(&profile, ProfileSource::User)?;
        }
        let mut attempt = self.attempt_profile(&profile, ProfileSource::User, options)?;
        attempt.report.bootstrapped = true;
        Ok(attempt)
    }

    /// Apply an already composed profile
    pub fn apply_profile(
        &self,
        profile: &Profile,
        source: ProfileSource,
        options: ApplyOptions,
    ) -> CoreResult<ApplyReport> {
        self.attempt_profile(profile, source, options)?.into_result()
    }

    fn attempt_profile(
        &self,
        profile: &Profile,
        source: ProfileSource,
        options: ApplyOptions,
    ) -> CoreResult<ApplyAttempt> {
        let plan = self.plan(profile, source, options)?;
        let mut report = ApplyReport::new(&profile.name, source, plan, options.dry_run);
        if options.dry_run {
            return Ok(ApplyAttempt::finished(report));
        }
        let failure = self.execute(&mut report).err();
        if let Some(e) = &failure {
            tracing::warn!("Apply of '{}' stopped: {e}", profile.name);
        }
        Ok(ApplyAttempt { report, failure })
    }

    /// Build the action plan against a fresh read of live state
    pub fn plan(
        &self,
        profile: &Profile,
        source: ProfileSource,
        options: ApplyOptions,
    ) -> CoreResult<ActionPlan> {
        let targets = target_scopes(profile, options.scope)?;
        let live = self.live();
        self.build_plan(profile, source, &targets, &live, options)
    }

    fn build_plan(
        &self,
        profile: &Profile,
        source: ProfileSource,
        targets: &BTreeMap<Scope, ScopeSettings>,
        live: &LiveState,
        options: ApplyOptions,
    ) -> CoreResult<ActionPlan> {
        let mut actions = Vec::new();

        let mut declared = ConfigSnapshot {
            marketplaces: profile.marketplaces.clone(),
            scopes: targets.clone(),
            ..ConfigSnapshot::default()
        };
        declared.normalize();
        let scopes: Vec<Scope> = targets.keys().copied().collect();
        let current = ConfigSnapshot::from_live_for(live, &declared, &scopes);
        let changes = diff(&current, &declared, DiffOptions::default());

        for marketplace in &profile.marketplaces {
            if !live.marketplaces.contains_location(&marketplace.repo) {
                actions.push(Action::AddMarketplace {
                    marketplace: marketplace.clone(),
                });
            }
        }

        for (scope, settings) in targets {
            for key in settings.plugins.sorted() {
                if options.reinstall || !live.is_installed(&key, *scope) {
                    actions.push(Action::InstallPlugin { key, scope: *scope });
                }
            }
        }

        for (scope, settings) in targets {
            let previous = live.settings_for(*scope).entries.clone();
            let entries = self.final_entries(*scope, settings, &previous, live, options);
            if entries != previous {
                let path = self.config.claude.settings_path(*scope, &self.project_dir);
                let preview = preview(&path, &settings_document(&path, &entries)?)?;
                actions.push(Action::WriteSettings {
                    scope: *scope,
                    path,
                    previous,
                    entries,
                    preview,
                });
            }
        }

        for (scope, settings) in targets {
            let live_servers = live.servers(*scope);
            let upsert: Vec<McpServer> = settings
                .mcp_servers
                .iter()
                .filter(|s| live_servers.iter().find(|l| l.name == s.name) != Some(*s))
                .cloned()
                .collect();
            let remove: Vec<String> = if options.replace {
                live_servers
                    .iter()
                    .filter(|l| settings.server(&l.name).is_none())
                    .map(|l| l.name.clone())
                    .collect()
            } else {
                Vec::new()
            };
            if !upsert.is_empty() || !remove.is_empty() {
                actions.push(Action::WriteMcpServers {
                    scope: *scope,
                    location: self.config.claude.mcp_location(*scope, &self.project_dir),
                    upsert,
                    remove,
                });
            }
        }

        let crumb_scope = options.scope.unwrap_or(Scope::User);
        if !self
            .breadcrumbs
            .is_current(crumb_scope, &profile.name, &self.project_dir)
        {
            actions.push(Action::WriteBreadcrumb {
                scope: crumb_scope,
                profile: profile.name.clone(),
            });
        }

        if targets.contains_key(&Scope::Project) {
            let pointer = ProjectPointer::read(&self.project_dir).unwrap_or_else(|e| {
                tracing::warn!("Rewriting unreadable project pointer: {e}");
                None
            });
            if !pointer.is_some_and(|p| p.points_to(&profile.name, source)) {
                actions.push(Action::WritePointer {
                    profile: profile.name.clone(),
                    source,
                });
            }
        }

        if let Some(hook) = &profile.post_apply {
            actions.push(Action::RunHook {
                command: hook.command.clone(),
                condition: hook.condition,
            });
        }

        tracing::debug!(
            "Planned {} action(s) for '{}' from {} difference(s)",
            actions.len(),
            profile.name,
            changes.len()
        );
        Ok(ActionPlan {
            profile: profile.name.clone(),
            diff: changes,
            actions,
        })
    }

    /// `enabledPlugins` a scope should end up with
    fn final_entries(
        &self,
        scope: Scope,
        declared: &ScopeSettings,
        previous: &BTreeMap<String, bool>,
        live: &LiveState,
        options: ApplyOptions,
    ) -> BTreeMap<String, bool> {
        let declared_entries = declared.plugins.iter().map(|k| (k.to_string(), true));
        if scope != Scope::User || options.replace {
            return declared_entries.collect();
        }

        let extras: Vec<PluginKey> = live
            .enabled(scope)
            .into_iter()
            .filter(|k| !declared.plugins.contains(k))
            .collect();
        let mut entries = previous.clone();
        if !extras.is_empty()
            && self.extras.resolve_extras(scope, &extras) == ExtrasDecision::Remove
        {
            for key in &extras {
                entries.remove(&key.to_string());
            }
        }
        entries.extend(declared_entries);
        entries
    }

    fn execute(&self, report: &mut ApplyReport) -> CoreResult<()> {
        let actions = report.plan.actions.clone();

        let mut marketplaces = Vec::new();
        let mut plugins = Vec::new();
        for action in &actions {
            match action {
                Action::AddMarketplace { marketplace } => {
                    marketplaces.push(InstallTarget::Marketplace(marketplace.clone()));
                }
                Action::InstallPlugin { key, scope } => plugins.push(InstallTarget::Plugin {
                    key: key.clone(),
                    scope: *scope,
                }),
                _ => {}
            }
        }

        let parallel = self.config.max_parallel_installs;
        let mut outcomes = run_installs(
            self.installer.as_ref(),
            &marketplaces,
            &self.project_dir,
            parallel,
            &self.cancel,
        );
        outcomes.extend(run_installs(
            self.installer.as_ref(),
            &plugins,
            &self.project_dir,
            parallel,
            &self.cancel,
        ));

        let failed_plugins: HashSet<(Scope, String)> = outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .filter_map(|o| match &o.target {
                InstallTarget::Plugin { key, scope } => Some((*scope, key.to_string())),
                InstallTarget::Marketplace(_) => None,
            })
            .collect();
        let mut converged = outcomes.iter().any(InstallOutcome::succeeded);

        for action in &actions {
            match action {
                Action::WriteSettings {
                    scope,
                    path,
                    previous,
                    entries,
                    ..
                } => {
                    let mut entries = entries.clone();
                    for (_, key) in failed_plugins.iter().filter(|(s, _)| s == scope) {
                        match previous.get(key) {
                            Some(value) => entries.insert(key.clone(), *value),
                            None => entries.remove(key),
                        };
                    }
                    if entries != *previous {
                        write_json_atomic(path, &settings_document(path, &entries)?)?;
                        tracing::info!("Wrote {scope} settings to {}", path.display());
                        converged = true;
                    }
                }
                Action::WriteMcpServers {
                    scope,
                    location,
                    upsert,
                    remove,
                } => {
                    write_json_atomic(&location.path, &mcp_document(location, upsert, remove)?)?;
                    tracing::info!(
                        "Wrote {scope} MCP servers to {}",
                        location.path.display()
                    );
                    converged = true;
                }
                _ => {}
            }
        }

        report.installs = outcomes;
        report.changed = converged;

        let failed: Vec<String> = report
            .failed_installs()
            .map(|o| match &o.result {
                Err(reason) => format!("{} ({reason})", o.target),
                Ok(()) => o.target.to_string(),
            })
            .collect();
        if !failed.is_empty() {
            return Err(CoreError::InstallFailure { failed });
        }

        for action in &actions {
            match action {
                Action::WriteBreadcrumb { scope, profile } => {
                    if self.breadcrumbs.record(*scope, profile, &self.project_dir)? {
                        report.changed = true;
                    }
                }
                Action::WritePointer { profile, source } => {
                    ProjectPointer::new(profile.clone(), *source).write(&self.project_dir)?;
                    tracing::info!("Pointed .claudeup.json at '{profile}'");
                    report.changed = true;
                }
                _ => {}
            }
        }

        let hook = actions.iter().find_map(|a| match a {
            Action::RunHook { command, condition } => Some(PostApplyHook {
                command: command.clone(),
                condition: *condition,
            }),
            _ => None,
        });
        if let Some(hook) = hook {
            if !hook.should_run(converged) {
                report.hook = Some(HookOutcome::Skipped);
                return Ok(());
            }
            if let Err(reason) = self.hooks.run(&hook.command, &self.project_dir) {
                report.hook = Some(HookOutcome::Failed(reason.clone()));
                return Err(CoreError::HookFailure {
                    command: hook.command,
                    reason,
                });
            }
            report.hook = Some(HookOutcome::Succeeded);
        }
        Ok(())
    }
}
