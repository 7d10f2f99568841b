//! Artifact contents: descriptors, capability markers and loaded types

use serde::{Deserialize, Serialize};

use crate::Plugin;
use crate::error::PluginError;
use crate::event::{EventHandler, EventType, HandlerFn};

/// Identity of a plugin, declared once per artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin id (used for dependency declarations)
    pub id: String,
    /// Display name
    pub name: String,
    /// Plugin version as a `major.minor.patch` triple
    pub version: String,
    /// Whether the plugin may be loaded after initialization
    #[serde(default)]
    pub loadable_at_runtime: bool,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            loadable_at_runtime: false,
        }
    }

    /// Builder: allow loading this plugin after initialization
    pub fn loadable_at_runtime(mut self, loadable: bool) -> Self {
        self.loadable_at_runtime = loadable;
        self
    }
}

/// Capability marker attached to a loaded type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// The type is the plugin's entry point
    Plugin(PluginDescriptor),
    /// The type's handlers are scanned into the event bus
    EventHandlerSubscriber,
    /// A host-defined marker, bucketed by name during scanning
    Custom(String),
}

/// Creates a plugin's main instance
pub type PluginFactory = fn() -> Result<Box<dyn Plugin>, PluginError>;

fn default_factory<P: Plugin + Default>() -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(P::default()))
}

/// One type exposed by an artifact, with everything the host may scan on it
#[derive(Debug, Clone)]
pub struct LoadedType {
    pub name: String,
    pub markers: Vec<Marker>,
    /// Handlers declared on this type
    pub handlers: Vec<EventHandler>,
    /// No-argument constructor for the plugin's main instance
    pub factory: Option<PluginFactory>,
}

impl LoadedType {
    /// A type with no markers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            handlers: Vec::new(),
            factory: None,
        }
    }

    /// The plugin entry type, constructed through `P::default()`
    pub fn plugin<P: Plugin + Default>(name: impl Into<String>, descriptor: PluginDescriptor) -> Self {
        Self::new(name)
            .with_marker(Marker::Plugin(descriptor))
            .with_factory(default_factory::<P>)
    }

    /// A type carrying the handler-subscriber marker
    pub fn subscriber(name: impl Into<String>) -> Self {
        Self::new(name).with_marker(Marker::EventHandlerSubscriber)
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Builder: attach a custom marker by name
    pub fn with_custom_marker(self, marker: impl Into<String>) -> Self {
        self.with_marker(Marker::Custom(marker.into()))
    }

    /// Builder: declare a handler for `accepts`
    pub fn with_handler(
        mut self,
        name: impl Into<String>,
        accepts: EventType,
        callback: HandlerFn,
    ) -> Self {
        self.handlers.push(EventHandler::new(name, accepts, callback));
        self
    }

    pub fn with_factory(mut self, factory: PluginFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Plugin descriptors attached to this type
    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.markers.iter().filter_map(|m| match m {
            Marker::Plugin(descriptor) => Some(descriptor),
            _ => None,
        })
    }

    pub fn is_subscriber(&self) -> bool {
        self.markers
            .iter()
            .any(|m| matches!(m, Marker::EventHandlerSubscriber))
    }

    pub fn has_custom_marker(&self, marker: &str) -> bool {
        self.markers
            .iter()
            .any(|m| matches!(m, Marker::Custom(name) if name == marker))
    }
}

/// Everything an artifact exposes to the host
#[derive(Debug, Clone)]
pub struct ArtifactManifest {
    /// API version this artifact was built against
    pub api_version: u32,
    pub types: Vec<LoadedType>,
}

impl ArtifactManifest {
    pub fn new() -> Self {
        Self {
            api_version: crate::API_VERSION,
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, loaded_type: LoadedType) -> Self {
        self.types.push(loaded_type);
        self
    }
}

impl Default for ArtifactManifest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[derive(Default)]
    struct Dummy;

    impl Plugin for Dummy {}

    fn on_init(_event: &mut Event) -> Result<(), PluginError> {
        Ok(())
    }

    #[test]
    fn test_descriptor_defaults_not_loadable_at_runtime() {
        let descriptor = PluginDescriptor::new("chat", "Chat", "1.0.0");
        assert!(!descriptor.loadable_at_runtime);
        assert!(descriptor.loadable_at_runtime(true).loadable_at_runtime);
    }

    #[test]
    fn test_descriptor_toml_default_flag() {
        let descriptor: PluginDescriptor =
            toml::from_str("id = \"chat\"\nname = \"Chat\"\nversion = \"1.0.0\"").unwrap();
        assert!(!descriptor.loadable_at_runtime);
    }

    #[test]
    fn test_plugin_type_has_descriptor_and_factory() {
        let ty = LoadedType::plugin::<Dummy>("Dummy", PluginDescriptor::new("d", "D", "0.1.0"));

        assert_eq!(ty.descriptors().count(), 1);
        assert!(ty.factory.is_some());
        assert!(!ty.is_subscriber());

        let factory = ty.factory.unwrap();
        let instance = factory().unwrap();
        assert!(instance.downcast_ref::<Dummy>().is_some());
    }

    #[test]
    fn test_subscriber_with_handlers() {
        let ty = LoadedType::subscriber("Listener")
            .with_handler("on_init", EventType::initialization(), on_init)
            .with_custom_marker("Command");

        assert!(ty.is_subscriber());
        assert!(ty.has_custom_marker("Command"));
        assert!(!ty.has_custom_marker("Route"));
        assert_eq!(ty.handlers.len(), 1);
        assert_eq!(ty.handlers[0].name, "on_init");
    }

    #[test]
    fn test_manifest_default_api_version() {
        let manifest = ArtifactManifest::default();
        assert_eq!(manifest.api_version, crate::API_VERSION);
        assert!(manifest.types.is_empty());
    }
}
