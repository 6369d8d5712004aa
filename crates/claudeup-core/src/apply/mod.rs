//! Apply engine: plan, install, write, hook

mod hook;
mod install;
mod plan;
mod reconcile;
pub mod write;

pub use hook::{HookOutcome, HookRunner, ShellHookRunner};
pub use install::{
    run_installs, CancelToken, ClaudeCliInstaller, InstallOutcome, InstallTarget, Installer,
};
pub use plan::{Action, ActionPlan};
pub use reconcile::{
    ApplyAttempt, ApplyOptions, ApplyReport, ExtrasDecision, ExtrasResolver, NonInteractive,
    Reconciler,
};
