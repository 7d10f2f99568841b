//! Event model shared between the host and plugin artifacts.
//!
//! Event types are nominal tags carrying their supertype chain, so a handler
//! declared for a general type (e.g. [`EventType::event`]) is bound to every
//! more specific type at registration time. Payloads use plain data and JSON
//! so they cross the dynamic-library boundary without relying on `TypeId`.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::PluginError;

/// Name of the root event type
pub const EVENT: &str = "Event";
/// Name of the parent type of all manager-sent events
pub const PLUGIN_MANAGER_EVENT: &str = "PluginManagerEvent";
/// Name of the event dispatched once all artifacts are registered
pub const INITIALIZATION_EVENT: &str = "InitializationEvent";
/// Name of the event relaying plugin configurations
pub const CONFIGURATION_LOADING_EVENT: &str = "ConfigurationLoadingEvent";

// ─── Event Types ─────────────────────────────────────────────────────

/// A nominal event kind.
///
/// Identity is the name alone; the supertype chain (nearest first) only
/// drives handler matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventType {
    name: String,
    #[serde(default)]
    supertypes: Vec<String>,
}

impl EventType {
    /// The root type every event type descends from
    pub fn event() -> Self {
        Self {
            name: EVENT.to_string(),
            supertypes: Vec::new(),
        }
    }

    /// Create a new event type deriving from `parent`
    pub fn new(name: impl Into<String>, parent: &EventType) -> Self {
        let mut supertypes = Vec::with_capacity(parent.supertypes.len() + 1);
        supertypes.push(parent.name.clone());
        supertypes.extend(parent.supertypes.iter().cloned());
        Self {
            name: name.into(),
            supertypes,
        }
    }

    /// Parent of all events sent by the manager itself
    pub fn plugin_manager_event() -> Self {
        Self::new(PLUGIN_MANAGER_EVENT, &Self::event())
    }

    /// Type of [`InitializationEvent`]
    pub fn initialization() -> Self {
        Self::new(INITIALIZATION_EVENT, &Self::plugin_manager_event())
    }

    /// Type of [`ConfigurationLoadingEvent`]
    pub fn configuration_loading() -> Self {
        Self::new(CONFIGURATION_LOADING_EVENT, &Self::plugin_manager_event())
    }

    /// Event types known before any plugin declares its own
    pub fn builtins() -> Vec<Self> {
        vec![Self::configuration_loading(), Self::initialization()]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ancestors of this type, nearest first
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// Whether a handler declared for `self` can receive an event of type `other`.
    ///
    /// True when both are the same type or `self` is one of `other`'s supertypes.
    pub fn accepts(&self, other: &EventType) -> bool {
        self.name == other.name || other.supertypes.iter().any(|s| *s == self.name)
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

/// Signature of an event handler.
///
/// Handlers are plain functions: they carry no receiver, and they only see
/// the event for the duration of the call.
pub type HandlerFn = fn(&mut Event) -> Result<(), PluginError>;

/// A handler declared on a subscriber type
#[derive(Debug, Clone)]
pub struct EventHandler {
    /// Handler name; overloads share a name and differ in `accepts`
    pub name: String,
    /// The event type named by the handler's parameter
    pub accepts: EventType,
    /// The function to invoke
    pub callback: HandlerFn,
}

impl EventHandler {
    pub fn new(name: impl Into<String>, accepts: EventType, callback: HandlerFn) -> Self {
        Self {
            name: name.into(),
            accepts,
            callback,
        }
    }
}

/// Identity of a bound handler.
///
/// Two handlers with the same name on one subscriber are distinct when they
/// accept different event types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerId {
    pub plugin: String,
    pub subscriber: String,
    pub handler: String,
    /// Name of the event type the handler was declared for
    pub accepts: String,
}

impl HandlerId {
    pub fn new(
        plugin: impl Into<String>,
        subscriber: impl Into<String>,
        handler: impl Into<String>,
        accepts: impl Into<String>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            subscriber: subscriber.into(),
            handler: handler.into(),
            accepts: accepts.into(),
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}::{}({})",
            self.plugin, self.subscriber, self.handler, self.accepts
        )
    }
}

// ─── Events ──────────────────────────────────────────────────────────

/// Kind-specific data carried by an [`Event`]
#[derive(Debug, Clone)]
pub enum EventPayload {
    Initialization(InitializationEvent),
    ConfigurationLoading(ConfigurationLoadingEvent),
    /// Payload of a plugin-declared event type
    Custom(serde_json::Value),
}

/// A transient event value passed by exclusive reference to each handler.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: EventType,
    sender: String,
    handled_by: Vec<HandlerId>,
    payload: EventPayload,
}

impl Event {
    /// Create an [`InitializationEvent`] sent by `sender`
    pub fn initialization(sender: impl Into<String>) -> Self {
        Self {
            event_type: EventType::initialization(),
            sender: sender.into(),
            handled_by: Vec::new(),
            payload: EventPayload::Initialization(InitializationEvent::default()),
        }
    }

    /// Create a [`ConfigurationLoadingEvent`] sent by `sender`
    pub fn configuration_loading(
        sender: impl Into<String>,
        configurations: ConfigurationLoadingEvent,
    ) -> Self {
        Self {
            event_type: EventType::configuration_loading(),
            sender: sender.into(),
            handled_by: Vec::new(),
            payload: EventPayload::ConfigurationLoading(configurations),
        }
    }

    /// Create an event of a plugin-declared type with a JSON payload
    pub fn custom(
        event_type: EventType,
        sender: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            sender: sender.into(),
            handled_by: Vec::new(),
            payload: EventPayload::Custom(payload),
        }
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Id of the plugin that sent this event
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Record that a handler received this event
    pub fn add_handler(&mut self, handler: HandlerId) {
        self.handled_by.push(handler);
    }

    /// Handlers that received this event, in invocation order
    pub fn handlers(&self) -> &[HandlerId] {
        &self.handled_by
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn into_payload(self) -> EventPayload {
        self.payload
    }

    pub fn as_initialization(&self) -> Option<&InitializationEvent> {
        match &self.payload {
            EventPayload::Initialization(init) => Some(init),
            _ => None,
        }
    }

    pub fn as_initialization_mut(&mut self) -> Option<&mut InitializationEvent> {
        match &mut self.payload {
            EventPayload::Initialization(init) => Some(init),
            _ => None,
        }
    }

    pub fn as_configuration_loading(&self) -> Option<&ConfigurationLoadingEvent> {
        match &self.payload {
            EventPayload::ConfigurationLoading(conf) => Some(conf),
            _ => None,
        }
    }

    /// Deserialize a custom payload into `T`
    pub fn custom_payload<T: DeserializeOwned>(&self) -> Result<T, PluginError> {
        match &self.payload {
            EventPayload::Custom(value) => {
                serde_json::from_value(value.clone()).map_err(|e| PluginError::UnexpectedPayload {
                    event_type: self.event_type.name.clone(),
                    message: e.to_string(),
                })
            }
            _ => Err(PluginError::UnexpectedPayload {
                event_type: self.event_type.name.clone(),
                message: "not a custom event".to_string(),
            }),
        }
    }
}

/// Declarations collected from plugins once every artifact is registered.
///
/// Handlers write dependency ranges and new event types into it; the manager
/// reads them back after dispatch returns.
#[derive(Debug, Clone, Default)]
pub struct InitializationEvent {
    dependencies: Vec<String>,
    new_events: Vec<EventType>,
}

impl InitializationEvent {
    /// Declare a dependency on plugin `id`.
    ///
    /// `None` bounds are unconstrained and serialized as `any`, giving
    /// `id@lower:upper`.
    pub fn add_dependency(&mut self, id: &str, lower: Option<&str>, upper: Option<&str>) {
        let lower = lower.unwrap_or("any");
        let upper = upper.unwrap_or("any");
        self.dependencies.push(format!("{id}@{lower}:{upper}"));
    }

    /// Dependency declarations in `id@lower:upper` form
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Declare a new event type for handlers to be bound to
    pub fn add_event(&mut self, event_type: EventType) {
        self.new_events.push(event_type);
    }

    pub fn events(&self) -> &[EventType] {
        &self.new_events
    }
}

/// Plugin configurations keyed by plugin id
#[derive(Debug, Clone, Default)]
pub struct ConfigurationLoadingEvent {
    configurations: HashMap<String, Configuration>,
}

impl ConfigurationLoadingEvent {
    pub fn add_configuration(&mut self, plugin_id: impl Into<String>, configuration: Configuration) {
        self.configurations.insert(plugin_id.into(), configuration);
    }

    pub fn configuration(&self, plugin_id: &str) -> Option<&Configuration> {
        self.configurations.get(plugin_id)
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}
