//! plughost-api - Plugin API for the plughost plugin manager
//!
//! This crate provides the types needed to write plugin artifacts for plughost.
//! An artifact is a native Rust dynamic library that describes its contents with
//! an [`ArtifactManifest`]: exactly one plugin entry type carrying a
//! [`PluginDescriptor`], any number of handler-subscriber types whose
//! [`EventHandler`]s are wired into the host's event bus, and types tagged with
//! custom markers the host asked to look out for.
//!
//! # Example
//!
//! ```ignore
//! use plughost_api::{
//!     export_artifact, ArtifactManifest, Event, EventType, LoadedType, Plugin, PluginDescriptor,
//!     PluginError,
//! };
//!
//! #[derive(Default)]
//! pub struct ChatPlugin;
//!
//! impl Plugin for ChatPlugin {}
//!
//! fn on_init(event: &mut Event) -> Result<(), PluginError> {
//!     if let Some(init) = event.as_initialization_mut() {
//!         init.add_dependency("storage", Some("1.0.0"), None);
//!         init.add_event(EventType::new("ChatEvent", &EventType::event()));
//!     }
//!     Ok(())
//! }
//!
//! fn manifest() -> ArtifactManifest {
//!     ArtifactManifest::new()
//!         .with_type(LoadedType::plugin::<ChatPlugin>(
//!             "ChatPlugin",
//!             PluginDescriptor::new("chat", "Chat", "1.0.0"),
//!         ))
//!         .with_type(
//!             LoadedType::subscriber("ChatListener")
//!                 .with_handler("on_init", EventType::initialization(), on_init),
//!         )
//! }
//!
//! export_artifact!(manifest);
//! ```

use std::any::Any;

pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::{Configuration, PLUGIN_ID_KEY};
pub use error::PluginError;
pub use event::{
    ConfigurationLoadingEvent, Event, EventHandler, EventPayload, EventType, HandlerFn, HandlerId,
    InitializationEvent,
};
pub use types::{ArtifactManifest, LoadedType, Marker, PluginDescriptor, PluginFactory};

/// Current plugin API version. Artifacts must match this exactly.
/// This is checked when loading artifacts to ensure compatibility.
pub const API_VERSION: u32 = 1;

/// Symbol exporting the artifact's [`ArtifactManifest`]
pub const MANIFEST_SYMBOL: &[u8] = b"_plughost_artifact_manifest";

/// Symbol exporting the artifact's API version
pub const API_VERSION_SYMBOL: &[u8] = b"_plughost_api_version";

/// A plugin's main instance.
///
/// The host creates exactly one through the entry type's factory and keeps it
/// for the life of the process. Implementors only need `impl Plugin for T {}`.
pub trait Plugin: Any + Send {}

impl dyn Plugin {
    /// Downcast the instance to its concrete type
    pub fn downcast_ref<T: Plugin>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Mutable variant of [`downcast_ref`](Self::downcast_ref)
    pub fn downcast_mut<T: Plugin>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

/// Export an artifact manifest for dynamic loading.
///
/// This macro generates the C ABI entry points that plughost uses to read an
/// artifact. The argument is a function returning [`ArtifactManifest`].
///
/// # Usage
///
/// ```ignore
/// plughost_api::export_artifact!(manifest);
/// ```
///
/// # Generated Functions
///
/// - `_plughost_artifact_manifest()`: Builds the manifest and hands ownership to the host
/// - `_plughost_api_version()`: Returns the API version
#[macro_export]
macro_rules! export_artifact {
    ($manifest_fn:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _plughost_artifact_manifest() -> *mut $crate::ArtifactManifest {
            let manifest: $crate::ArtifactManifest = $manifest_fn();
            Box::into_raw(Box::new(manifest))
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plughost_api_version() -> u32 {
            $crate::API_VERSION
        }
    };
}
