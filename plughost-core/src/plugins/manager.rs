//! PluginManager - owns the registry and event bus and drives initialization

use std::fmt;
use std::path::{Path, PathBuf};

use plughost_api::{
    Configuration, ConfigurationLoadingEvent, Event, EventType, InitializationEvent, Plugin,
    PluginError,
};

use super::discovery::discover_files;
use super::loader::{ArtifactLoader, DylibLoader};
use super::registry::{LoadedPlugin, MANAGER_PLUGIN_ID, PluginRegistry};
use super::scanner::scan;
use crate::config::collect_configurations;
use crate::dependency;
use crate::error::{AggregateError, ManagerError};
use crate::events::{EventBus, HandlerBinding};
use crate::version::VersionParseError;

/// Initialization progress of a [`PluginManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// Artifacts may still be queued
    Idle,
    /// Loading, scanning and registering queued artifacts
    Loading,
    /// Binding handlers to the known event types
    Registering,
    /// Collecting declarations from the initialization event
    AwaitingDeclarations,
    /// Checking collected dependency declarations
    ResolvingDependencies,
    /// Initialization finished
    Ready,
    /// Initialization failed; registered plugins stay registered
    Failed,
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Registering => "Registering",
            Self::AwaitingDeclarations => "AwaitingDeclarations",
            Self::ResolvingDependencies => "ResolvingDependencies",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// The plugin manager.
///
/// A single owned instance holds every piece of host state; all operations
/// run synchronously on the caller's thread.
pub struct PluginManager {
    loader: Box<dyn ArtifactLoader>,
    queue: Vec<PathBuf>,
    custom_markers: Vec<String>,
    /// Holds handler pointers into loaded libraries; dropped before `registry`
    bus: EventBus,
    registry: PluginRegistry,
    state: InitState,
}

impl PluginManager {
    /// Create a manager loading artifacts through `loader`
    pub fn new(loader: impl ArtifactLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            queue: Vec::new(),
            custom_markers: Vec::new(),
            bus: EventBus::new(),
            registry: PluginRegistry::new(),
            state: InitState::Idle,
        }
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Artifacts queued for [`initialize`](Self::initialize)
    pub fn queued(&self) -> &[PathBuf] {
        &self.queue
    }

    /// Also bucket types carrying custom marker `marker` in subsequent scans
    pub fn add_custom_marker(&mut self, marker: impl Into<String>) {
        let marker = marker.into();
        if !self.custom_markers.contains(&marker) {
            tracing::debug!(marker = %marker, "Registered custom marker");
            self.custom_markers.push(marker);
        }
    }

    /// Declare an event type. Once the manager is ready, existing handlers are
    /// bound to it immediately.
    pub fn inject_event(&mut self, event_type: EventType) -> bool {
        let added = self.bus.declare_event_type(event_type);
        if added && self.state == InitState::Ready {
            self.bus.refresh(&self.registry);
        }
        added
    }

    /// Queue one artifact for initialization
    pub fn add_plugin_to_load(&mut self, path: impl Into<PathBuf>) -> Result<(), ManagerError> {
        self.expect_state(InitState::Idle)?;
        let path = path.into();
        tracing::debug!(path = %path.display(), "Queued plugin artifact");
        self.queue.push(path);
        Ok(())
    }

    /// Queue every artifact found under `dir`. Returns how many were queued.
    pub fn add_plugins_from(&mut self, dir: &Path, recursive: bool) -> Result<usize, ManagerError> {
        self.expect_state(InitState::Idle)?;
        let found = discover_files(dir, recursive, self.loader.extension())?;
        let count = found.len();
        self.queue.extend(found);

        tracing::info!(dir = %dir.display(), count, "Queued plugin artifacts");
        Ok(count)
    }

    /// Bind a handler explicitly to a declared event type
    pub fn add_handler_to_event_bus(
        &mut self,
        event_type: &str,
        binding: HandlerBinding,
    ) -> Result<(), ManagerError> {
        self.bus.add_handler(event_type, binding)
    }

    /// Run the initialization protocol over every queued artifact.
    ///
    /// Load failures are collected across all artifacts; handler failures
    /// during the initialization event are reported together with dependency
    /// failures. Nothing registered is rolled back on failure.
    pub fn initialize(&mut self) -> Result<(), AggregateError> {
        self.expect_state(InitState::Idle)?;

        self.transition(InitState::Loading);
        let mut errors = AggregateError::new();

        if let Err(e) = self.registry.register(LoadedPlugin::manager()) {
            errors.push(e);
        }

        for path in std::mem::take(&mut self.queue) {
            let registered = self
                .load_plugin(&path)
                .and_then(|plugin| self.registry.register(plugin));
            if let Err(e) = registered {
                tracing::error!(path = %path.display(), error = %e, "Failed to load plugin");
                errors.push(e);
            }
        }

        if !errors.is_empty() {
            return self.fail(errors);
        }

        self.transition(InitState::Registering);
        self.bus.refresh(&self.registry);

        self.transition(InitState::AwaitingDeclarations);
        let mut event = Event::initialization(MANAGER_PLUGIN_ID);
        if let Err(e) = self.bus.dispatch(&mut event) {
            errors.append(e);
        }
        let declarations = event.as_initialization().cloned().unwrap_or_default();

        self.transition(InitState::ResolvingDependencies);
        if let Err(e) = dependency::resolve(declarations.dependencies(), &self.registry) {
            errors.append(e);
        }

        if !errors.is_empty() {
            return self.fail(errors);
        }

        self.apply_declarations(&declarations);
        self.transition(InitState::Ready);

        tracing::info!(plugins = self.registry.len(), "Plugin manager ready");
        Ok(())
    }

    /// Load one artifact into a ready manager.
    ///
    /// The plugin must be marked loadable at runtime. Only its own handlers
    /// receive the initialization event. Failures leave it registered.
    pub fn load_plugin_at_runtime(&mut self, path: &Path) -> Result<(), AggregateError> {
        self.expect_state(InitState::Ready)?;

        let plugin = self.load_plugin(path)?;
        if !plugin.descriptor().loadable_at_runtime {
            return Err(ManagerError::MalformedPlugin {
                artifact: path.to_path_buf(),
                reason: format!("plugin '{}' is not loadable at runtime", plugin.id()),
            }
            .into());
        }

        let plugin_id = plugin.id().to_string();
        self.registry.register(plugin)?;
        self.bus.refresh(&self.registry);

        let mut errors = AggregateError::new();
        let mut event = Event::initialization(MANAGER_PLUGIN_ID);
        if let Err(e) = self.bus.dispatch_to_plugin(&plugin_id, &mut event) {
            errors.append(e);
        }
        let declarations = event.as_initialization().cloned().unwrap_or_default();

        if let Err(e) = dependency::resolve(declarations.dependencies(), &self.registry) {
            errors.append(e);
        }

        if !errors.is_empty() {
            tracing::error!(
                plugin = %plugin_id,
                errors = errors.len(),
                "Runtime plugin load failed"
            );
            return Err(errors);
        }

        self.apply_declarations(&declarations);
        tracing::info!(plugin = %plugin_id, "Loaded plugin at runtime");
        Ok(())
    }

    /// Read plugin configurations under `dir`, add `extra`, and relay the
    /// result in one configuration loading event.
    ///
    /// Every configuration is routed by its own `pluginid`. No event is sent
    /// if any of them is broken, unaddressed or claims an id already taken.
    pub fn load_configurations(
        &mut self,
        dir: &Path,
        recursive: bool,
        extra: impl IntoIterator<Item = Configuration>,
    ) -> Result<(), AggregateError> {
        self.expect_state(InitState::Ready)?;

        let configurations = collect_configurations(dir, recursive, extra)?;

        let mut payload = ConfigurationLoadingEvent::default();
        for (plugin_id, configuration) in configurations {
            payload.add_configuration(plugin_id, configuration);
        }

        tracing::info!(count = payload.len(), "Relaying plugin configurations");
        let mut event = Event::configuration_loading(MANAGER_PLUGIN_ID, payload);
        self.bus.dispatch(&mut event)
    }

    /// Dispatch `event` to the handlers bound to its type
    pub fn send_event(&self, event: &mut Event) -> Result<(), AggregateError> {
        self.bus.dispatch(event)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&LoadedPlugin> {
        self.registry.find_by_id(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&LoadedPlugin> {
        self.registry.find_by_name(name)
    }

    /// Main instance of the plugin named `name`
    pub fn plugin_instance(&self, name: &str) -> Option<&(dyn Plugin + 'static)> {
        self.registry.find_by_name(name).map(LoadedPlugin::instance)
    }

    pub fn plugin_instance_mut(&mut self, name: &str) -> Option<&mut (dyn Plugin + 'static)> {
        self.registry
            .find_by_name_mut(name)
            .map(LoadedPlugin::instance_mut)
    }

    /// A fresh instance of the plugin named `name`; `Ok(None)` if no such plugin
    pub fn new_plugin_instance(&self, name: &str) -> Result<Option<Box<dyn Plugin>>, PluginError> {
        self.registry
            .find_by_name(name)
            .map(LoadedPlugin::new_instance)
            .transpose()
    }

    pub fn is_plugin_loaded(&self, id: &str) -> bool {
        self.registry.is_loaded(id)
    }

    pub fn is_plugin_loaded_at_version(&self, id: &str, version: &str) -> Result<bool, VersionParseError> {
        self.registry.is_loaded_at_version(id, version)
    }

    pub fn is_plugin_loaded_at_or_above(&self, id: &str, minimum: &str) -> Result<bool, VersionParseError> {
        self.registry.is_loaded_at_or_above(id, minimum)
    }

    pub fn is_plugin_loaded_at_or_below(&self, id: &str, maximum: &str) -> Result<bool, VersionParseError> {
        self.registry.is_loaded_at_or_below(id, maximum)
    }

    pub fn is_plugin_loaded_in_range(
        &self,
        id: &str,
        lower: Option<&str>,
        upper: Option<&str>,
    ) -> Result<bool, VersionParseError> {
        self.registry.is_loaded_in_range(id, lower, upper)
    }

    fn load_plugin(&mut self, path: &Path) -> Result<LoadedPlugin, ManagerError> {
        let artifact = self.loader.load(path)?;
        let (path, types, library) = artifact.into_parts();
        let scanned = scan(&path, types, &self.custom_markers)?;
        LoadedPlugin::from_scan(scanned, &path, library)
    }

    fn apply_declarations(&mut self, declarations: &InitializationEvent) {
        for event_type in declarations.events() {
            self.bus.declare_event_type(event_type.clone());
        }
        self.bus.refresh(&self.registry);
    }

    fn expect_state(&self, expected: InitState) -> Result<(), ManagerError> {
        if self.state != expected {
            return Err(ManagerError::InvalidState {
                expected: expected.to_string(),
                actual: self.state.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: InitState) {
        tracing::info!(from = %self.state, to = %next, "Plugin manager state changed");
        self.state = next;
    }

    fn fail(&mut self, errors: AggregateError) -> Result<(), AggregateError> {
        tracing::error!(
            state = %self.state,
            errors = errors.len(),
            "Plugin manager initialization failed"
        );
        self.transition(InitState::Failed);
        Err(errors)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new(DylibLoader::new())
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("state", &self.state)
            .field("queue", &self.queue)
            .field("custom_markers", &self.custom_markers)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::loader::StaticLoader;
    use plughost_api::{ArtifactManifest, HandlerId, LoadedType, PluginDescriptor};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Chat;

    impl Plugin for Chat {}

    fn ok(_event: &mut Event) -> Result<(), PluginError> {
        Ok(())
    }

    fn chat() -> ArtifactManifest {
        ArtifactManifest::new()
            .with_type(LoadedType::plugin::<Chat>(
                "Chat",
                PluginDescriptor::new("chat", "Chat", "1.0.0"),
            ))
            .with_type(LoadedType::new("Say").with_custom_marker("Command"))
    }

    fn impostor() -> ArtifactManifest {
        ArtifactManifest::new().with_type(LoadedType::plugin::<Chat>(
            "Impostor",
            PluginDescriptor::new(MANAGER_PLUGIN_ID, "Impostor", "9.9.9"),
        ))
    }

    fn manager() -> PluginManager {
        PluginManager::new(
            StaticLoader::new()
                .with_artifact("chat", chat)
                .with_artifact("impostor", impostor),
        )
    }

    #[test]
    fn test_empty_manager_initializes_with_itself() {
        let mut manager = manager();
        assert_eq!(manager.state(), InitState::Idle);

        manager.initialize().unwrap();

        assert_eq!(manager.state(), InitState::Ready);
        assert!(manager.is_plugin_loaded(MANAGER_PLUGIN_ID));
        assert!(manager.is_plugin_loaded_at_version(MANAGER_PLUGIN_ID, "1.0.0").unwrap());
        assert!(manager.plugin_instance("Plugin Manager").is_some());
    }

    #[test]
    fn test_initialize_twice_is_invalid() {
        let mut manager = manager();
        manager.initialize().unwrap();

        let err = manager.initialize().unwrap_err();
        assert!(matches!(
            &err.errors()[0],
            ManagerError::InvalidState { expected, actual } if expected == "Idle" && actual == "Ready"
        ));
        assert!(manager.add_plugin_to_load("late.plugin").is_err());
    }

    #[test]
    fn test_custom_markers_reach_registry() {
        let mut manager = manager();
        manager.add_custom_marker("Command");
        manager.add_custom_marker("Command");
        manager.add_plugin_to_load("chat.plugin").unwrap();
        manager.initialize().unwrap();

        let chat = manager.find_by_name("Chat").unwrap();
        assert_eq!(chat.types_with_marker("Command").len(), 1);
        assert!(manager.new_plugin_instance("Chat").unwrap().is_some());
        assert!(manager.new_plugin_instance("Nope").unwrap().is_none());
    }

    #[test]
    fn test_load_errors_are_aggregated_and_fail() {
        let mut manager = manager();
        manager.add_plugin_to_load("missing.plugin").unwrap();
        manager.add_plugin_to_load("chat.plugin").unwrap();
        manager.add_plugin_to_load("impostor.plugin").unwrap();

        let err = manager.initialize().unwrap_err();

        assert_eq!(manager.state(), InitState::Failed);
        assert_eq!(err.len(), 2);
        assert!(matches!(err.errors()[0], ManagerError::Load(_)));
        assert!(matches!(
            &err.errors()[1],
            ManagerError::DuplicatePluginId { id } if id == MANAGER_PLUGIN_ID
        ));
        // no rollback
        assert!(manager.is_plugin_loaded("chat"));
    }

    #[test]
    fn test_add_plugins_from_uses_loader_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("chat.plugin"), b"").unwrap();
        std::fs::write(dir.path().join("readme.md"), b"").unwrap();

        let mut manager = manager();
        assert_eq!(manager.add_plugins_from(dir.path(), false).unwrap(), 1);
        assert_eq!(manager.queued().len(), 1);

        manager.initialize().unwrap();
        assert!(manager.is_plugin_loaded_in_range("chat", Some("1.0.0"), None).unwrap());
    }

    #[test]
    fn test_inject_event_after_ready_binds_handlers() {
        let mut manager = manager();
        manager.initialize().unwrap();

        let chat_event = EventType::new("ChatEvent", &EventType::event());
        assert!(manager.inject_event(chat_event.clone()));
        assert!(!manager.inject_event(chat_event));

        manager
            .add_handler_to_event_bus(
                "ChatEvent",
                HandlerBinding::new(HandlerId::new("host", "Host", "on_chat", "ChatEvent"), ok),
            )
            .unwrap();
        assert_eq!(manager.event_bus().bindings_for("ChatEvent").len(), 1);
        assert!(manager
            .add_handler_to_event_bus(
                "Unknown",
                HandlerBinding::new(HandlerId::new("host", "Host", "on_x", "ChatEvent"), ok),
            )
            .is_err());
    }

    #[test]
    fn test_runtime_load_requires_ready() {
        let mut manager = manager();
        let err = manager
            .load_plugin_at_runtime(Path::new("chat.plugin"))
            .unwrap_err();
        assert!(matches!(err.errors()[0], ManagerError::InvalidState { .. }));
    }

    #[test]
    fn test_runtime_load_requires_flag() {
        let mut manager = manager();
        manager.initialize().unwrap();

        let err = manager
            .load_plugin_at_runtime(Path::new("chat.plugin"))
            .unwrap_err();
        assert!(matches!(
            &err.errors()[0],
            ManagerError::MalformedPlugin { reason, .. } if reason.contains("not loadable at runtime")
        ));
        assert!(!manager.is_plugin_loaded("chat"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(InitState::AwaitingDeclarations.to_string(), "AwaitingDeclarations");
        assert_eq!(InitState::Failed.to_string(), "Failed");
    }
}
