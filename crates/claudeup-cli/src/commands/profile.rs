//! Profile CLI commands
//!
//! Handles: claudeup profile list/show/apply/diff/save/delete/rename/current

use clap::{Args, Subcommand, ValueEnum};

use claudeup_core::apply::{Action, ApplyReport, CancelToken, HookOutcome, Reconciler};
use claudeup_core::claudeup_live::{McpServer, Scope};
use claudeup_core::diff::{
    diff, diff_profile_live, format_diff_terminal, ConfigSnapshot, DiffOptions, DiffResult,
};
use claudeup_core::profile::{
    snapshot_live, HookCondition, Profile, ProfileKind, ProfileSource,
};
use claudeup_core::resolve::{current_profile, load_composed, resolve_reference};
use claudeup_core::ApplyOptions;

use super::prompt::PromptExtras;
use super::{Context, ScopeArgs};

/// Profile commands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List saved profiles
    List,
    /// Show a profile with its includes resolved
    Show {
        /// Profile name, group/name, or `current`
        profile: String,
    },
    /// Apply a profile to live configuration
    Apply(ApplyArgs),
    /// Compare a profile with live configuration or with another profile
    Diff(DiffArgs),
    /// Save live configuration as a profile
    Save {
        /// Profile name (group/name allowed)
        name: String,
        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
        /// Store to save into
        #[arg(long, value_enum, default_value = "user")]
        store: StoreArg,
    },
    /// Delete a profile
    Delete {
        /// Profile name or group/name
        profile: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Rename a profile within its store
    Rename {
        /// Current name
        profile: String,
        /// New name
        new_name: String,
    },
    /// Show the active profile
    Current {
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

/// Arguments for `claudeup profile apply`
#[derive(Args)]
pub struct ApplyArgs {
    /// Profile name, group/name, or `current`
    pub profile: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Make user scope declarative and remove undeclared MCP servers
    #[arg(long, alias = "reset")]
    pub replace: bool,

    /// Reinstall plugins that are already installed
    #[arg(long)]
    pub reinstall: bool,

    /// Show the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Create the profile from live state if it does not exist
    #[arg(long)]
    pub bootstrap: bool,
}

/// Arguments for `claudeup profile diff`
#[derive(Args)]
pub struct DiffArgs {
    /// Profile to compare
    pub profile: String,

    /// Second profile (compares against live configuration when omitted)
    pub other: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Show per-field changes inside modified entries
    #[arg(long)]
    pub full: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StoreArg {
    User,
    Project,
}

impl From<StoreArg> for ProfileSource {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::User => Self::User,
            StoreArg::Project => Self::Project,
        }
    }
}

pub fn execute(cmd: ProfileCommands, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        ProfileCommands::List => execute_list(ctx),
        ProfileCommands::Show { profile } => execute_show(ctx, &profile),
        ProfileCommands::Apply(args) => execute_apply(ctx, &args),
        ProfileCommands::Diff(args) => execute_diff(ctx, &args),
        ProfileCommands::Save {
            name,
            description,
            store,
        } => execute_save(ctx, &name, description, store.into()),
        ProfileCommands::Delete { profile, force } => execute_delete(ctx, &profile, force),
        ProfileCommands::Rename { profile, new_name } => {
            execute_rename(ctx, &profile, &new_name)
        }
        ProfileCommands::Current { scope } => execute_current(ctx, scope.selected()),
    }
}

fn execute_list(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.store();
    let locations = store.list()?;
    if locations.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    let active = current_profile(&ctx.breadcrumbs(), &ctx.project_dir, None)?
        .map(|a| a.breadcrumb.profile);

    println!("Profiles:");
    for location in locations {
        let marker = if active.as_deref() == Some(location.reference.as_str()) {
            "*"
        } else {
            " "
        };
        let description = match store.load_at(&location) {
            Ok(profile) => profile
                .description
                .unwrap_or_else(|| "No description".to_string()),
            Err(e) => format!("unreadable: {e}"),
        };
        println!(
            "{marker} {} [{}] - {description}",
            location.reference, location.source
        );
    }
    Ok(())
}

fn execute_show(ctx: &Context, reference: &str) -> anyhow::Result<()> {
    let store = ctx.store();
    let name = resolve_reference(reference, &ctx.breadcrumbs(), &ctx.project_dir, None)?;
    let (location, profile) = load_composed(&store, &name, ctx.chooser())?;
    let declared = store.load_at(&location)?;

    println!("Profile: {location}");
    println!("Path: {}", location.path.display());
    if let Some(description) = &profile.description {
        println!("Description: {description}");
    }
    let kind = match declared.kind {
        ProfileKind::LegacyFlat => "legacy (flat plugin list, user scope)",
        ProfileKind::PerScope => "per-scope",
        ProfileKind::Stack => "stack",
    };
    println!("Kind: {kind}");
    if !declared.includes.is_empty() {
        println!("Includes: {}", declared.includes.join(", "));
    }

    if !profile.marketplaces.is_empty() {
        println!("\nMarketplaces:");
        for marketplace in &profile.marketplaces {
            println!("  {marketplace}");
        }
    }

    for scope in Scope::ALL {
        let settings = profile.scope(scope);
        if settings.is_empty() {
            continue;
        }
        println!("\n{scope} scope:");
        if !settings.plugins.is_empty() {
            println!("  Plugins:");
            for key in settings.plugins.sorted() {
                println!("    {key}");
            }
        }
        if !settings.mcp_servers.is_empty() {
            println!("  MCP servers:");
            for server in &settings.mcp_servers {
                println!("    {}", describe_server(server));
            }
        }
    }

    print_extensions(&profile);
    if let Some(hook) = &profile.post_apply {
        let condition = match hook.condition {
            HookCondition::Always => "always",
            HookCondition::OnChange => "on change",
        };
        println!("\nPost-apply hook ({condition}): {}", hook.command);
    }
    Ok(())
}

fn describe_server(server: &McpServer) -> String {
    let spec = &server.spec;
    match (&spec.command, &spec.url) {
        (Some(command), _) if spec.args.is_empty() => format!("{} ({command})", server.name),
        (Some(command), _) => format!("{} ({command} {})", server.name, spec.args.join(" ")),
        (None, Some(url)) => format!("{} ({url})", server.name),
        (None, None) => server.name.clone(),
    }
}

fn print_extensions(profile: &Profile) {
    let extensions = &profile.extensions;
    if extensions.is_empty() {
        return;
    }
    println!("\nExtensions (not applied):");
    for (label, items) in [
        ("agents", &extensions.agents),
        ("commands", &extensions.commands),
        ("skills", &extensions.skills),
    ] {
        if !items.is_empty() {
            println!("  {label}: {}", items.join(", "));
        }
    }
}

fn execute_apply(ctx: &Context, args: &ApplyArgs) -> anyhow::Result<()> {
    let options = ApplyOptions {
        scope: args.scope.selected(),
        replace: args.replace,
        reinstall: args.reinstall,
        dry_run: args.dry_run,
        bootstrap: args.bootstrap,
    };

    let mut reconciler = Reconciler::new(&ctx.config, &ctx.project_dir);
    if !args.dry_run {
        reconciler = reconciler.with_cancel_token(interrupt_token());
    }
    if !ctx.assume_yes {
        reconciler = reconciler.with_extras_resolver(PromptExtras);
    }
    let attempt = reconciler.attempt_with(&args.profile, options, ctx.chooser())?;
    print_report(&attempt.report, attempt.failure.is_some());
    match attempt.failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Token cancelled by the first Ctrl-C; a second one exits immediately
fn interrupt_token() -> CancelToken {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            eprintln!("\nReceived second interrupt, exiting immediately...");
            std::process::exit(130);
        }
        eprintln!("\nInterrupted: no new installs will start, waiting for running ones...");
        handler_token.cancel();
    });
    if let Err(e) = installed {
        tracing::warn!("Could not install Ctrl-C handler: {e}");
    }
    cancel
}

fn print_report(report: &ApplyReport, failed: bool) {
    if report.bootstrapped {
        println!(
            "Profile '{}' did not exist; created it from live configuration.",
            report.profile
        );
    }
    println!("Applying '{}' [{}]:", report.profile, report.source);
    print!("{}", report.plan.describe());

    if report.dry_run {
        for action in &report.plan.actions {
            if let Action::WriteSettings { path, preview, .. } = action {
                if !preview.is_empty() {
                    println!("\n{}:\n{preview}", path.display());
                }
            }
        }
        println!("\nDry run - no changes made.");
        return;
    }

    if !report.installs.is_empty() {
        println!("\nInstalls:");
        for outcome in &report.installs {
            match &outcome.result {
                Ok(()) => println!("  ✓ {}", outcome.target),
                Err(e) => println!("  ✗ {}: {e}", outcome.target),
            }
        }
    }

    match &report.hook {
        Some(HookOutcome::Succeeded) => println!("\nPost-apply hook succeeded."),
        Some(HookOutcome::Skipped) => println!("\nPost-apply hook skipped (nothing changed)."),
        Some(HookOutcome::Failed(reason)) => println!("\nPost-apply hook failed: {reason}"),
        None => {}
    }

    if report.changed && !failed {
        println!("\nApplied profile '{}'.", report.profile);
    }
}

fn execute_diff(ctx: &Context, args: &DiffArgs) -> anyhow::Result<()> {
    let store = ctx.store();
    let breadcrumbs = ctx.breadcrumbs();
    let options = DiffOptions { full: args.full };
    let scope = args.scope.selected();

    let name = resolve_reference(&args.profile, &breadcrumbs, &ctx.project_dir, None)?;
    let (_, profile) = load_composed(&store, &name, ctx.chooser())?;

    let result: DiffResult = match &args.other {
        Some(other) => {
            let other = resolve_reference(other, &breadcrumbs, &ctx.project_dir, None)?;
            let (_, target) = load_composed(&store, &other, ctx.chooser())?;
            let scopes = scope.map_or_else(|| Scope::ALL.to_vec(), |s| vec![s]);
            diff(
                &ConfigSnapshot::from_profile(&profile).restrict(&scopes),
                &ConfigSnapshot::from_profile(&target).restrict(&scopes),
                options,
            )
        }
        None => diff_profile_live(&profile, &ctx.live(), scope, options),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.is_empty() {
        println!("No differences.");
    } else {
        print!("{}", format_diff_terminal(&result, options));
    }
    Ok(())
}

fn execute_save(
    ctx: &Context,
    name: &str,
    description: Option<String>,
    source: ProfileSource,
) -> anyhow::Result<()> {
    let store = ctx.store();
    let exists = store
        .find(name)?
        .iter()
        .any(|l| l.source == source && l.reference == name);
    if exists && !ctx.confirm(&format!("Profile '{name}' already exists. Overwrite?")) {
        println!("Cancelled.");
        return Ok(());
    }

    let mut profile = snapshot_live(name, &ctx.live());
    profile.description = description;
    let location = store.save(&profile, source)?;
    println!(
        "Saved profile '{location}' ({} plugin(s), {} marketplace(s)) to {}",
        profile.plugin_count(),
        profile.marketplaces.len(),
        location.path.display()
    );
    Ok(())
}

fn execute_delete(ctx: &Context, reference: &str, force: bool) -> anyhow::Result<()> {
    let store = ctx.store();
    let location = store.locate_with(reference, ctx.chooser())?;
    if !force && !ctx.confirm(&format!("Delete profile '{location}'?")) {
        println!("Cancelled.");
        return Ok(());
    }
    store.delete_at(&location, &ctx.breadcrumbs())?;
    println!("Deleted profile '{location}'");
    Ok(())
}

fn execute_rename(ctx: &Context, reference: &str, new_name: &str) -> anyhow::Result<()> {
    let store = ctx.store();
    let location = store.locate_with(reference, ctx.chooser())?;
    let renamed = store.rename_at(&location, new_name, &ctx.breadcrumbs())?;
    println!("Renamed '{location}' to '{renamed}'");
    Ok(())
}

fn execute_current(ctx: &Context, pin: Option<Scope>) -> anyhow::Result<()> {
    let Some(active) = current_profile(&ctx.breadcrumbs(), &ctx.project_dir, pin)? else {
        println!("No profile applied");
        return Ok(());
    };
    let missing = if ctx.store().exists(&active.breadcrumb.profile) {
        ""
    } else {
        " - profile no longer exists"
    };
    println!(
        "{} ({} scope, applied {}){missing}",
        active.breadcrumb.profile,
        active.scope,
        active.breadcrumb.applied_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}
