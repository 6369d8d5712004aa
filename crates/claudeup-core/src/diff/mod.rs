//! Structural diff between configuration snapshots
//!
//! Every comparison (profile vs live, profile vs profile, scope vs scope)
//! goes through [`ConfigSnapshot`] and produces a [`DiffResult`].

mod display;
mod engine;
mod snapshot;
mod types;

pub use display::{format_diff_terminal, generate_text_diff, DiffSummary};
pub use engine::{
    annotate_also_in_profile, diff, diff_profile_live, diff_scopes, patch, DiffOptions,
};
pub use snapshot::ConfigSnapshot;
pub use types::{Annotation, Change, ChangeKind, DiffResult, Field};
