//! Diff display formatting for user review

use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;

use super::engine::DiffOptions;
use super::types::{Change, ChangeKind, DiffResult, Field};

fn heading(field: Field) -> &'static str {
    match field {
        Field::Description => "Description",
        Field::Marketplaces => "Marketplaces",
        Field::Plugins => "Plugins",
        Field::McpServers => "MCP servers",
        Field::Agents => "Agents",
        Field::Commands => "Commands",
        Field::Skills => "Skills",
        Field::PostApply => "Post-apply hook",
    }
}

/// Render a value; objects collapse to `{...}` unless `full`
fn render_value(value: &Value, full: bool) -> String {
    match value {
        Value::Object(_) if !full => "{...}".to_string(),
        other => other.to_string(),
    }
}

fn render_change(change: &Change, full: bool) -> String {
    let mut line = format!("  {} ", change.kind.marker());

    let name = match (&change.subfield, change.key.is_empty()) {
        (Some(sub), false) => format!("{}.{sub}", change.key),
        (Some(sub), true) => sub.clone(),
        (None, false) => change.key.clone(),
        (None, true) => String::new(),
    };
    line.push_str(&name);
    if let Some(scope) = change.scope {
        let _ = write!(line, " ({scope} scope)");
    }

    // set membership entries carry no value worth printing
    let show_values = !matches!(
        change.field,
        Field::Plugins | Field::Agents | Field::Commands | Field::Skills
    );

    if show_values {
        let sep = if name.is_empty() { "" } else { ": " };
        match (&change.before, &change.after) {
            (Some(before), Some(after)) => {
                let _ = write!(
                    line,
                    "{sep}{} -> {}",
                    render_value(before, full),
                    render_value(after, full)
                );
            }
            (None, Some(after)) => {
                let _ = write!(line, "{sep}{}", render_value(after, full));
            }
            (Some(before), None) => {
                let _ = write!(line, "{sep}{}", render_value(before, full));
            }
            (None, None) => {}
        }
        if change.subfield.is_some() {
            match change.kind {
                ChangeKind::Added => line.push_str(" (added)"),
                ChangeKind::Removed => line.push_str(" (removed)"),
                ChangeKind::Modified => {}
            }
        }
    }

    for annotation in &change.annotations {
        let _ = write!(line, " {annotation}");
    }
    line
}

/// Format a diff result for terminal display
///
/// Changes are grouped under one heading per field, in result order.
pub fn format_diff_terminal(result: &DiffResult, options: DiffOptions) -> String {
    let mut output = String::new();

    if result.is_empty() {
        let _ = writeln!(output, "No changes");
        return output;
    }

    let mut current: Option<Field> = None;
    for change in result {
        if current != Some(change.field) {
            if current.is_some() {
                let _ = writeln!(output);
            }
            let _ = writeln!(output, "{}:", heading(change.field));
            current = Some(change.field);
        }
        let _ = writeln!(output, "{}", render_change(change, options.full));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{}", DiffSummary::from_result(result).one_line());
    output
}

/// Summary statistics for a diff result
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffSummary {
    /// Count changes by kind
    pub fn from_result(result: &DiffResult) -> Self {
        let mut summary = Self::default();
        for change in result {
            match change.kind {
                ChangeKind::Added => summary.added += 1,
                ChangeKind::Removed => summary.removed += 1,
                ChangeKind::Modified => summary.modified += 1,
            }
        }
        summary
    }

    /// Format as a one-line summary
    pub fn one_line(&self) -> String {
        format!(
            "{} added, {} removed, {} modified",
            self.added, self.removed, self.modified
        )
    }
}

/// Generate a unified diff between two strings
#[must_use]
pub fn generate_text_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = String::new();

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        output.push_str(sign);
        output.push_str(change.value());
        if !change.value().ends_with('\n') {
            output.push('\n');
        }
    }

    output
}
