//! Plugin registry - the authoritative list of loaded plugins

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use libloading::Library;
use plughost_api::{LoadedType, Plugin, PluginDescriptor, PluginFactory};

use super::scanner::ScanResult;
use crate::error::ManagerError;
use crate::version::{Version, VersionParseError};

/// Id under which the manager registers itself
pub const MANAGER_PLUGIN_ID: &str = "pluginmanager";
/// Display name of the manager's own registry entry
pub const MANAGER_PLUGIN_NAME: &str = "Plugin Manager";
/// Version of the manager's own registry entry
pub const MANAGER_PLUGIN_VERSION: &str = "1.0.0";

/// Main instance of the manager's own registry entry
#[derive(Debug, Default)]
pub struct ManagerPlugin;

impl Plugin for ManagerPlugin {}

fn manager_factory() -> Result<Box<dyn Plugin>, plughost_api::PluginError> {
    Ok(Box::new(ManagerPlugin))
}

/// A registered plugin.
///
/// Lives until the manager is dropped; there is no unload path.
pub struct LoadedPlugin {
    descriptor: PluginDescriptor,
    version: Version,
    source: Option<PathBuf>,
    /// Must drop before `_library`: its vtable lives in the library
    instance: Box<dyn Plugin>,
    factory: PluginFactory,
    subscribers: Vec<LoadedType>,
    custom: HashMap<String, Vec<LoadedType>>,
    _library: Option<Library>,
}

impl LoadedPlugin {
    /// Build a registry entry from a scanned artifact, creating its main instance
    pub fn from_scan(
        scan: ScanResult,
        source: &Path,
        library: Option<Library>,
    ) -> Result<Self, ManagerError> {
        let version: Version = scan.descriptor.version.parse()?;

        let Some(factory) = scan.entry.factory else {
            return Err(ManagerError::MalformedPlugin {
                artifact: source.to_path_buf(),
                reason: format!("plugin entry type {} has no constructor", scan.entry.name),
            });
        };

        let instance = factory().map_err(|e| ManagerError::MalformedPlugin {
            artifact: source.to_path_buf(),
            reason: format!("failed to create plugin instance: {e}"),
        })?;

        Ok(Self {
            descriptor: scan.descriptor,
            version,
            source: Some(source.to_path_buf()),
            instance,
            factory,
            subscribers: scan.subscribers,
            custom: scan.custom,
            _library: library,
        })
    }

    /// The manager's own synthetic entry
    pub fn manager() -> Self {
        Self {
            descriptor: PluginDescriptor::new(
                MANAGER_PLUGIN_ID,
                MANAGER_PLUGIN_NAME,
                MANAGER_PLUGIN_VERSION,
            ),
            version: Version::new(1, 0, 0),
            source: None,
            instance: Box::new(ManagerPlugin),
            factory: manager_factory,
            subscribers: Vec::new(),
            custom: HashMap::new(),
            _library: None,
        }
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Artifact this plugin was loaded from; `None` for the manager itself
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn instance(&self) -> &(dyn Plugin + 'static) {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> &mut (dyn Plugin + 'static) {
        self.instance.as_mut()
    }

    /// Create a fresh instance through the entry type's constructor
    pub fn new_instance(&self) -> Result<Box<dyn Plugin>, plughost_api::PluginError> {
        (self.factory)()
    }

    /// Types carrying the handler-subscriber marker
    pub fn subscribers(&self) -> &[LoadedType] {
        &self.subscribers
    }

    /// Types carrying custom marker `marker`, empty when none were found
    pub fn types_with_marker(&self, marker: &str) -> &[LoadedType] {
        self.custom.get(marker).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("descriptor", &self.descriptor)
            .field("source", &self.source)
            .field("subscribers", &self.subscribers.len())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Loaded plugins in registration order.
///
/// Lookups are linear scans; registries stay small.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<LoadedPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin, rejecting an id that is already registered
    pub fn register(&mut self, plugin: LoadedPlugin) -> Result<(), ManagerError> {
        if self.is_loaded(plugin.id()) {
            return Err(ManagerError::DuplicatePluginId {
                id: plugin.id().to_string(),
            });
        }

        tracing::info!(
            plugin = %plugin.id(),
            name = %plugin.name(),
            version = %plugin.version(),
            "Registered plugin"
        );
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|p| p.id() == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut LoadedPlugin> {
        self.plugins.iter_mut().find(|p| p.name() == name)
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Whether plugin `id` is loaded at exactly `version`
    pub fn is_loaded_at_version(&self, id: &str, version: &str) -> Result<bool, VersionParseError> {
        let wanted: Version = version.parse()?;
        Ok(self.find_by_id(id).is_some_and(|p| *p.version() == wanted))
    }

    pub fn is_loaded_at_or_above(&self, id: &str, minimum: &str) -> Result<bool, VersionParseError> {
        self.is_loaded_in_range(id, Some(minimum), None)
    }

    pub fn is_loaded_at_or_below(&self, id: &str, maximum: &str) -> Result<bool, VersionParseError> {
        self.is_loaded_in_range(id, None, Some(maximum))
    }

    /// Whether plugin `id` is loaded with a version inside the inclusive
    /// bounds. `None` leaves a side unconstrained.
    pub fn is_loaded_in_range(
        &self,
        id: &str,
        lower: Option<&str>,
        upper: Option<&str>,
    ) -> Result<bool, VersionParseError> {
        let lower = lower.map(str::parse::<Version>).transpose()?;
        let upper = upper.map(str::parse::<Version>).transpose()?;
        Ok(self
            .find_by_id(id)
            .is_some_and(|p| p.version().is_within(lower.as_ref(), upper.as_ref())))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoadedPlugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<'a> IntoIterator for &'a PluginRegistry {
    type Item = &'a LoadedPlugin;
    type IntoIter = std::slice::Iter<'a, LoadedPlugin>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}
