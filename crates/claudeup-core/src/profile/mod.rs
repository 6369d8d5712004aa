//! Profile model, store, stack composition and live snapshots

pub mod document;
pub mod snapshot;
pub mod stack;
pub mod store;
mod types;

pub use document::{ProfileDocument, ProfileShape};
pub use snapshot::snapshot_live;
pub use stack::compose;
pub use store::{ProfileLocation, ProfileSource, ProfileStore};
pub use types::*;
