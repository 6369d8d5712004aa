//! claudeup CLI - Command-line interface for claudeup
//!
//! Provides `claudeup profile`, `claudeup status`, `claudeup scopes` and
//! `claudeup drift`.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use claudeup_core::CoreError;
use tracing_subscriber::EnvFilter;

use commands::drift::DriftCommands;
use commands::profile::ProfileCommands;
use commands::scopes::ScopesCommands;
use commands::Context;

/// Environment variable that sets the log filter when `-v` is not given
const LOG_ENV: &str = "CLAUDEUP_LOG";

#[derive(Parser)]
#[command(name = "claudeup")]
#[command(about = "claudeup - Claude Code profile manager")]
#[command(version)]
struct Cli {
    /// Assume yes: skip confirmations and never prompt
    #[arg(short = 'y', long = "yes", global = true)]
    yes: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage and apply profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Show the effective plugin configuration across scopes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare live scopes with each other
    Scopes {
        #[command(subcommand)]
        action: ScopesCommands,
    },
    /// Compare the project's .claudeup.json with live project settings
    Drift {
        #[command(subcommand)]
        action: Option<DriftCommands>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(cli.yes)?;
    match cli.command {
        Commands::Profile { action } => commands::profile::execute(action, &ctx),
        Commands::Status { json } => commands::status::execute(&ctx, json),
        Commands::Scopes { action } => commands::scopes::execute(action, &ctx),
        Commands::Drift { action, json } => commands::drift::execute(action, &ctx, json),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        if let Some(fix) = e.downcast_ref::<CoreError>().and_then(CoreError::remediation) {
            eprintln!("  Try: {fix}");
        }
        std::process::exit(1);
    }
}
