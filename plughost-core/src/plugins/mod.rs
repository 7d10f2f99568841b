//! Plugin system for plughost
//!
//! This module provides the infrastructure for loading and managing plugins:
//!
//! - [`PluginManager`]: Owns the registry and event bus and runs initialization
//! - [`PluginRegistry`]: The loaded plugins, with lookup by id, name and version
//! - [`ArtifactLoader`]: Turns an artifact path into its types ([`DylibLoader`], [`StaticLoader`])
//!
//! # Plugin Discovery
//!
//! Artifacts are discovered in the configured plugin directory, by default
//! `~/.config/plughost/plugins/`, matching the loader's file extension
//! (`.so`/`.dylib`/`.dll` for [`DylibLoader`]).
//!
//! # Example
//!
//! ```ignore
//! use plughost_core::plugins::PluginManager;
//! use plughost_core::PluginManagerConfig;
//!
//! let config = PluginManagerConfig::default();
//! let mut manager = PluginManager::default();
//!
//! manager.add_custom_marker("Command");
//! manager.add_plugins_from(&config.plugin_dir, config.recursive)?;
//! manager.initialize()?;
//!
//! manager.load_configurations(&config.config_dir, config.recursive, [])?;
//! ```

pub mod discovery;
pub mod loader;
mod manager;
pub mod registry;
pub mod scanner;

pub use discovery::{discover_files, native_artifact_extension};
pub use loader::{ArtifactLoader, DylibLoader, LoadedArtifact, ManifestFn, StaticLoader};
pub use manager::{InitState, PluginManager};
pub use registry::{LoadedPlugin, MANAGER_PLUGIN_ID, PluginRegistry};
pub use scanner::{ScanResult, scan};
