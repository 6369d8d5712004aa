//! claudeup core - profile engine and reconciliation
//!
//! This crate provides the profile data model and stores, stack
//! composition, scope resolution, the structural diff engine, the apply
//! engine that converges live state to a profile, and drift detection.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub mod apply;
pub mod breadcrumb;
pub mod config;
pub mod diff;
pub mod drift;
pub mod error;
pub mod pointer;
pub mod profile;
pub mod resolve;
pub mod util;

pub use claudeup_live;

pub use apply::{ApplyOptions, ApplyReport, Reconciler};
pub use breadcrumb::BreadcrumbStore;
pub use config::Config;
pub use diff::{ConfigSnapshot, DiffResult};
pub use drift::{DriftDetector, DriftEntry, DriftKind};
pub use error::{CoreError, CoreResult};
pub use profile::{Profile, ProfileStore};
