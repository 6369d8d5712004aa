//! `claudeup status`

use serde_json::json;

use claudeup_core::claudeup_live::Scope;
use claudeup_core::resolve::{current_profile, EffectiveConfig};

use super::Context;

pub fn execute(ctx: &Context, json_output: bool) -> anyhow::Result<()> {
    let live = ctx.live();
    let effective = EffectiveConfig::from_live(&live, &Scope::ALL);
    let active = current_profile(&ctx.breadcrumbs(), &ctx.project_dir, None)?;

    if json_output {
        let sections: serde_json::Map<String, serde_json::Value> = Scope::ALL
            .iter()
            .map(|scope| {
                let plugins: Vec<_> = effective
                    .section(*scope)
                    .iter()
                    .map(|p| json!({ "key": p.key.to_string(), "installed": p.installed }))
                    .collect();
                let servers = effective.mcp_servers.get(scope).cloned().unwrap_or_default();
                (
                    scope.to_string(),
                    json!({ "plugins": plugins, "mcpServers": servers }),
                )
            })
            .collect();
        let output = json!({
            "projectDir": ctx.project_dir.display().to_string(),
            "activeProfile": active.as_ref().map(|a| json!({
                "name": a.breadcrumb.profile,
                "scope": a.scope.to_string(),
            })),
            "uniquePlugins": effective.unique_count(),
            "marketplaces": live.marketplaces.entries.keys().collect::<Vec<_>>(),
            "scopes": sections,
            "warnings": live.warnings.iter().map(|w| format!("{}: {}", w.path.display(), w.message)).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &active {
        Some(a) => println!(
            "Active profile: {} ({} scope)",
            a.breadcrumb.profile, a.scope
        ),
        None => println!("Active profile: none"),
    }
    println!("Project: {}", ctx.project_dir.display());
    println!(
        "Plugins: {} unique across scopes, {} marketplace(s) known",
        effective.unique_count(),
        live.marketplaces.entries.len()
    );

    for scope in Scope::ALL {
        let section = effective.section(scope);
        let servers = effective.mcp_servers.get(&scope).map_or(&[][..], Vec::as_slice);
        println!("\n{scope} scope:");
        if section.is_empty() && servers.is_empty() {
            println!("  (nothing enabled)");
            continue;
        }
        for plugin in section {
            if plugin.installed == Some(false) {
                println!("  {} (not installed)", plugin.key);
            } else {
                println!("  {}", plugin.key);
            }
        }
        if !servers.is_empty() {
            println!("  MCP servers: {}", servers.join(", "));
        }
    }

    let missing = effective.not_installed();
    if !missing.is_empty() {
        println!("\n⚠ {} enabled plugin(s) are not installed:", missing.len());
        for (scope, key) in missing {
            println!("  {key} ({scope} scope)");
        }
    }
    for warning in &live.warnings {
        println!("\n⚠ {} is unreadable: {}", warning.path.display(), warning.message);
    }
    Ok(())
}
