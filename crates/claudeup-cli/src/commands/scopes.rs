//! `claudeup scopes`

use clap::Subcommand;

use claudeup_core::claudeup_live::Scope;
use claudeup_core::diff::{diff_scopes, format_diff_terminal, ConfigSnapshot, DiffOptions};

use super::{parse_scope, Context};

/// Scope commands
#[derive(Subcommand)]
pub enum ScopesCommands {
    /// Show what differs between two live scopes
    Diff {
        /// Scope to compare from
        #[arg(value_parser = parse_scope)]
        from: Scope,
        /// Scope to compare to
        #[arg(value_parser = parse_scope)]
        to: Scope,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn execute(cmd: ScopesCommands, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        ScopesCommands::Diff { from, to, json } => {
            let snapshot = ConfigSnapshot::from_live(&ctx.live());
            let result = diff_scopes(&snapshot, from, to);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.is_empty() {
                println!("No differences between {from} and {to} scope.");
            } else {
                println!("{from} scope -> {to} scope:");
                print!("{}", format_diff_terminal(&result, DiffOptions::default()));
            }
        }
    }
    Ok(())
}
