//! Event bus - binds plugin handlers to event types and dispatches events
//!
//! Binding is polymorphic: a handler declared for a supertype is bound to
//! every known subtype when the bus is refreshed. Dispatch is exact: only the
//! bindings of the event's own type run.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use plughost_api::{Event, EventType, HandlerFn, HandlerId, PluginError};

use crate::error::{AggregateError, ManagerError};
use crate::plugins::registry::PluginRegistry;

/// A handler bound to one event type
#[derive(Debug, Clone)]
pub struct HandlerBinding {
    pub id: HandlerId,
    pub callback: HandlerFn,
}

impl HandlerBinding {
    pub fn new(id: HandlerId, callback: HandlerFn) -> Self {
        Self { id, callback }
    }
}

/// Known event types and their handler bindings
#[derive(Debug)]
pub struct EventBus {
    /// Declaration order
    known: Vec<EventType>,
    bindings: HashMap<String, Vec<HandlerBinding>>,
}

impl EventBus {
    /// Create a bus that knows the built-in event types
    pub fn new() -> Self {
        let mut bus = Self {
            known: Vec::new(),
            bindings: HashMap::new(),
        };
        for event_type in EventType::builtins() {
            bus.declare_event_type(event_type);
        }
        bus
    }

    /// Add `event_type` to the known set. Returns `false` if it was already known.
    ///
    /// A type is known by name; a later declaration never replaces the
    /// supertype chain of the first one.
    pub fn declare_event_type(&mut self, event_type: EventType) -> bool {
        if let Some(known) = self.known.iter().find(|t| t.name() == event_type.name()) {
            if known.supertypes() != event_type.supertypes() {
                tracing::warn!(
                    event_type = %event_type,
                    known = ?known.supertypes(),
                    declared = ?event_type.supertypes(),
                    "Event type redeclared with a different supertype chain, keeping the first"
                );
            }
            return false;
        }

        tracing::debug!(event_type = %event_type, "Declared event type");
        self.bindings.entry(event_type.name().to_string()).or_default();
        self.known.push(event_type);
        true
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known.iter().any(|t| t.name() == name)
    }

    pub fn known_types(&self) -> &[EventType] {
        &self.known
    }

    /// Bind every handler of every registered subscriber type to each known
    /// event type it accepts.
    ///
    /// Handlers already bound to a type are skipped, so repeated calls only add
    /// bindings for newly declared types. Returns the number of new bindings.
    pub fn refresh(&mut self, registry: &PluginRegistry) -> usize {
        let mut added = 0;

        for plugin in registry {
            for subscriber in plugin.subscribers() {
                for handler in &subscriber.handlers {
                    let id = HandlerId::new(
                        plugin.id(),
                        &subscriber.name,
                        &handler.name,
                        handler.accepts.name(),
                    );

                    for event_type in &self.known {
                        if !handler.accepts.accepts(event_type) {
                            continue;
                        }

                        let bound = self.bindings.entry(event_type.name().to_string()).or_default();
                        if bound.iter().any(|b| b.id == id) {
                            continue;
                        }

                        tracing::debug!(
                            handler = %id,
                            event_type = %event_type,
                            "Bound event handler"
                        );
                        bound.push(HandlerBinding::new(id.clone(), handler.callback));
                        added += 1;
                    }
                }
            }
        }

        tracing::debug!(added, "Refreshed event bus");
        added
    }

    /// Bind `binding` to the declared type `event_type`
    pub fn add_handler(
        &mut self,
        event_type: &str,
        binding: HandlerBinding,
    ) -> Result<(), ManagerError> {
        if !self.is_known(event_type) {
            return Err(ManagerError::UnknownEventType {
                name: event_type.to_string(),
            });
        }

        let bound = self.bindings.entry(event_type.to_string()).or_default();
        if !bound.iter().any(|b| b.id == binding.id) {
            tracing::debug!(handler = %binding.id, event_type, "Bound event handler");
            bound.push(binding);
        }
        Ok(())
    }

    /// Handlers bound to `event_type`, in registration order
    pub fn bindings_for(&self, event_type: &str) -> &[HandlerBinding] {
        self.bindings
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Invoke every handler bound to the event's exact type.
    ///
    /// Every handler runs even when earlier ones fail; the failures are
    /// returned together afterwards.
    pub fn dispatch(&self, event: &mut Event) -> Result<(), AggregateError> {
        let bindings = self.bindings_for(event.event_type().name());
        invoke(bindings.iter(), event)
    }

    /// Like [`dispatch`](Self::dispatch), restricted to handlers owned by `plugin_id`
    pub fn dispatch_to_plugin(&self, plugin_id: &str, event: &mut Event) -> Result<(), AggregateError> {
        let bindings = self.bindings_for(event.event_type().name());
        invoke(bindings.iter().filter(|b| b.id.plugin == plugin_id), event)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn invoke<'a>(
    bindings: impl Iterator<Item = &'a HandlerBinding>,
    event: &mut Event,
) -> Result<(), AggregateError> {
    let mut errors = AggregateError::new();

    tracing::debug!(
        event_type = %event.event_type(),
        sender = %event.sender(),
        "Dispatching event"
    );

    for binding in bindings {
        event.add_handler(binding.id.clone());

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| (binding.callback)(event)));

        let source = match result {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e,
            Err(panic) => PluginError::custom(format!("handler panicked: {}", panic_message(&*panic))),
        };

        tracing::warn!(
            handler = %binding.id,
            event_type = %event.event_type(),
            error = %source,
            "Event handler failed"
        );
        errors.push(ManagerError::HandlerInvocation {
            handler: binding.id.clone(),
            source,
        });
    }

    errors.into_result()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
