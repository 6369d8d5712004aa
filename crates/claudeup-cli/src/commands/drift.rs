//! Drift CLI commands
//!
//! Handles: claudeup drift, claudeup drift clean

use clap::Subcommand;
use serde_json::json;

use claudeup_core::claudeup_live::{PluginKey, Scope};
use claudeup_core::drift::{DeclaredSource, DriftReport};
use claudeup_core::{CoreError, DriftDetector};

use super::{parse_scope, Context};

/// Drift commands
#[derive(Subcommand)]
pub enum DriftCommands {
    /// Clean up one orphaned entry
    Clean {
        /// Plugin key (plugin@marketplace)
        key: String,
        /// Scope of the entry
        #[arg(long, value_parser = parse_scope, default_value = "project")]
        scope: Scope,
        /// Also remove the entry from the saved profile
        #[arg(long)]
        also_profile: bool,
    },
}

pub fn execute(
    cmd: Option<DriftCommands>,
    ctx: &Context,
    json_output: bool,
) -> anyhow::Result<()> {
    let detector = DriftDetector::new(&ctx.config, &ctx.project_dir);
    match cmd {
        None => execute_detect(&detector, json_output),
        Some(DriftCommands::Clean {
            key,
            scope,
            also_profile,
        }) => execute_clean(ctx, &detector, &key, scope, also_profile),
    }
}

fn describe_source(report: &DriftReport) -> String {
    match report.declared_from {
        DeclaredSource::PointerList => "the plugin list in .claudeup.json".to_string(),
        DeclaredSource::Profile => format!("profile '{}'", report.pointer.profile),
        DeclaredSource::Nothing => format!(
            "nothing (profile '{}' could not be loaded)",
            report.pointer.profile
        ),
    }
}

fn execute_detect(detector: &DriftDetector, json_output: bool) -> anyhow::Result<()> {
    let report = detector.detect()?;

    if json_output {
        let entries: Vec<_> = report
            .entries
            .iter()
            .map(|e| {
                json!({
                    "key": e.key.to_string(),
                    "scope": e.scope.to_string(),
                    "kind": e.kind.to_string(),
                    "alsoInProfile": e.also_in_profile,
                })
            })
            .collect();
        let output = json!({
            "profile": report.pointer.profile,
            "count": entries.len(),
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Declared by {}", describe_source(&report));
    if !report.has_drift() {
        println!("No drift detected.");
        return Ok(());
    }
    let count = report.entries.len();
    println!("\n{count} drifted {}:", if count == 1 { "entry" } else { "entries" });
    for entry in &report.entries {
        println!("  {entry}");
    }
    println!("\nClean one with: claudeup drift clean <key> --scope <scope>");
    Ok(())
}

fn execute_clean(
    ctx: &Context,
    detector: &DriftDetector,
    key: &str,
    scope: Scope,
    also_profile: bool,
) -> anyhow::Result<()> {
    let key: PluginKey = key.parse()?;
    let report = detector.detect()?;
    let entry = report
        .entries
        .iter()
        .find(|e| e.key == key && e.scope == scope)
        .ok_or_else(|| CoreError::NotFound {
            kind: "Drift entry",
            name: format!("{key} ({scope} scope)"),
        })?;

    if !ctx.confirm(&format!("Clean up {entry}?")) {
        println!("Cancelled.");
        return Ok(());
    }

    let outcome = detector.clean(entry, also_profile)?;
    if outcome.live {
        println!("✓ Removed {key} from {scope} settings");
    }
    if outcome.pointer {
        println!("✓ Removed {key} from .claudeup.json");
    }
    if outcome.profile {
        println!("✓ Removed {key} from profile '{}'", report.pointer.profile);
    }
    if entry.also_in_profile && !also_profile {
        println!(
            "{key} is still declared by the saved profile; \
             pass --also-profile to remove it there too."
        );
    }
    Ok(())
}
