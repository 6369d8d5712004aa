//! claudeup live state - read-only view of Claude Code plugin configuration
//!
//! This crate discovers what is actually installed and enabled: the
//! per-scope settings files, the installed-plugin registry, the known
//! marketplaces, and configured MCP servers. It never writes anything.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub mod error;
pub mod mcp;
pub mod paths;
pub mod plugin;
pub mod registry;
pub mod scope;
pub mod settings;
pub mod state;

pub use error::{LiveError, LiveResult};
pub use mcp::{McpServer, McpServerSpec};
pub use paths::ClaudePaths;
pub use plugin::PluginKey;
pub use registry::{InstallRecord, InstalledRegistry, KnownMarketplace, KnownMarketplaces};
pub use scope::Scope;
pub use settings::EnabledPlugins;
pub use state::{LiveState, LiveWarning};
