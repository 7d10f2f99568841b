//! plughost-core: Host side of the plughost plugin manager
//!
//! This crate loads plugin artifacts and wires them together:
//!
//! - **Discovery** - [`plugins::discover_files`] walks a directory for artifacts
//! - **Loading** - [`plugins::ArtifactLoader`] with a native dynamic-library and a static-table implementation
//! - **Scanning** - [`plugins::scan`] classifies an artifact's types by marker
//! - **Registry** - [`PluginRegistry`] with lookup by id, name and version range
//! - **Event bus** - [`EventBus`] binds handlers by event supertype and dispatches by exact type
//! - **Dependencies** - [`dependency::resolve`] checks `id@lower:upper` declarations
//! - **Errors** - batch operations report an [`AggregateError`] instead of failing fast
//!
//! [`PluginManager`] drives all of it through the initialization protocol:
//!
//! ```text
//! Idle -> Loading -> Registering -> AwaitingDeclarations -> ResolvingDependencies -> Ready
//!            |                                                       |
//!            +-------------------------> Failed <--------------------+
//! ```

pub mod config;
pub mod dependency;
pub mod error;
pub mod events;
pub mod plugins;
pub mod version;

pub use config::PluginManagerConfig;
pub use dependency::DependencyRange;
pub use error::{AggregateError, LoadError, ManagerError};
pub use events::{EventBus, HandlerBinding};
pub use plugins::{InitState, LoadedPlugin, PluginManager, PluginRegistry};
pub use version::{Version, VersionParseError};
