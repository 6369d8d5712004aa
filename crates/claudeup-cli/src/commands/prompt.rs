//! Interactive prompts
//!
//! Questions go to stderr so stdout stays clean for piping. End of input
//! counts as "no" (or "keep" for extras).

use std::io::{self, BufRead, Write};

use claudeup_core::apply::{ExtrasDecision, ExtrasResolver};
use claudeup_core::claudeup_live::{PluginKey, Scope};
use claudeup_core::profile::ProfileLocation;

fn ask(question: &str) -> Option<String> {
    eprint!("{question} ");
    let _ = io::stderr().flush();
    let mut input = String::new();
    match io::stdin().lock().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

pub fn confirm(question: &str) -> bool {
    ask(&format!("{question} [y/N]"))
        .is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"))
}

/// Pick one of several profiles sharing a name
pub fn choose_location(candidates: &[ProfileLocation]) -> Option<usize> {
    eprintln!("Several profiles match:");
    for (i, candidate) in candidates.iter().enumerate() {
        eprintln!("  {}. {candidate}", i + 1);
    }
    let answer = ask(&format!("Choose [1-{}]:", candidates.len()))?;
    answer
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=candidates.len()).contains(n))
        .map(|n| n - 1)
}

/// Asks whether user-scope extras should stay enabled
pub struct PromptExtras;

impl ExtrasResolver for PromptExtras {
    fn resolve_extras(&self, scope: Scope, extras: &[PluginKey]) -> ExtrasDecision {
        eprintln!(
            "{} plugin(s) enabled at {scope} scope are not in the profile:",
            extras.len()
        );
        for key in extras {
            eprintln!("  {key}");
        }
        match ask("[a]dd the profile's plugins and keep these, or [r]eplace them? [A/r]") {
            Some(answer) if answer.eq_ignore_ascii_case("r") => ExtrasDecision::Remove,
            _ => ExtrasDecision::Keep,
        }
    }
}
