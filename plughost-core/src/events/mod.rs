//! Event handling
//!
//! The event model itself lives in `plughost-api`; this module holds the
//! host-side bus that binds and dispatches handlers.

mod bus;

pub use bus::{EventBus, HandlerBinding};
pub use plughost_api::{ConfigurationLoadingEvent, Event, EventType, InitializationEvent};
