//! # topicbus Core
//!
//! In-process publish/subscribe event bus.
//! Provides the bus itself, handler and subscription types, typed topics,
//! and the error types shared by the rest of the workspace.

pub mod error;
pub mod event_bus;

pub use error::{BusError, HandlerError, HandlerErrorKind, Result};

// Re-export event bus for convenience
pub use event_bus::{
    event_bus, init_event_bus, Envelope, EventBus, EventBusConfig, Handler, Subscription,
    SubscriptionId, SubscriptionState, TypedTopic, MAX_TAP_CAPACITY,
};
