//! Diff result types

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use claudeup_live::Scope;

/// Snapshot field a change belongs to
///
/// The variant order is the order changes are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Description,
    Marketplaces,
    Plugins,
    McpServers,
    Agents,
    Commands,
    Skills,
    PostApply,
}

impl Field {
    /// Name as written in profile documents
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Marketplaces => "marketplaces",
            Self::Plugins => "plugins",
            Self::McpServers => "mcpServers",
            Self::Agents => "agents",
            Self::Commands => "commands",
            Self::Skills => "skills",
            Self::PostApply => "postApply",
        }
    }

    /// Whether the field holds a single value rather than a keyed set
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(self, Self::Description | Self::PostApply)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// Marker used in terminal output
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Modified => '~',
        }
    }
}

/// Extra information attached to a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Annotation {
    /// The same key is declared in the saved profile
    AlsoInProfile,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlsoInProfile => write!(f, "(also in profile)"),
        }
    }
}

/// One structural difference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub field: Field,
    /// Scope for per-scope fields (plugins, MCP servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// Natural identity: plugin key, marketplace repo, server name, file
    /// reference; empty for scalar fields
    pub key: String,
    /// Sub-field of a struct value (full diff mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subfield: Option<String>,
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Change {
    pub(crate) fn new(
        field: Field,
        scope: Option<Scope>,
        key: impl Into<String>,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Option<Self> {
        let kind = match (&before, &after) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            (Some(b), Some(a)) if b != a => ChangeKind::Modified,
            _ => return None,
        };
        Some(Self {
            field,
            scope,
            key: key.into(),
            subfield: None,
            kind,
            before,
            after,
            annotations: Vec::new(),
        })
    }

    /// Dotted path, e.g. `plugins.user.a@m` or `mcpServers.project.db.args`
    #[must_use]
    pub fn path(&self) -> String {
        let mut path = self.field.as_str().to_string();
        if let Some(scope) = self.scope {
            path.push('.');
            path.push_str(scope.as_str());
        }
        if !self.key.is_empty() {
            path.push('.');
            path.push_str(&self.key);
        }
        if let Some(sub) = &self.subfield {
            path.push('.');
            path.push_str(sub);
        }
        path
    }

    pub fn has(&self, annotation: Annotation) -> bool {
        self.annotations.contains(&annotation)
    }

    pub(crate) fn sort_key(&self) -> (Field, Option<Scope>, &str, Option<&str>) {
        (
            self.field,
            self.scope,
            self.key.as_str(),
            self.subfield.as_deref(),
        )
    }
}

/// Ordered set of changes
///
/// Changes are grouped by field, then scope (user, project, local), then
/// key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    pub changes: Vec<Change>,
}

impl DiffResult {
    pub(crate) fn from_changes(mut changes: Vec<Change>) -> Self {
        changes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Changes of one kind
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }

    /// Changes to one field
    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.field == field)
    }

    /// Changes to one field at one scope
    pub fn for_scope(&self, field: Field, scope: Scope) -> impl Iterator<Item = &Change> {
        self.changes
            .iter()
            .filter(move |c| c.field == field && c.scope == Some(scope))
    }
}

impl<'a> IntoIterator for &'a DiffResult {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
