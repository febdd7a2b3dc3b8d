//! # Event Bus Module
//!
//! Topic-based publish/subscribe for decoupled communication between
//! components of one process.
//!
//! ## Overview
//!
//! - Publishers name a topic and hand over a payload without knowing who listens
//! - Subscribers register a [`Handler`] per topic and get a [`Subscription`] back
//! - Delivery is synchronous, in registration order, over a snapshot
//! - Failing or panicking handlers are isolated and reported
//!
//! ## Usage
//!
//! ```rust
//! use topicbus_core::event_bus::{EventBus, Handler};
//! use serde_json::json;
//!
//! let bus: EventBus = EventBus::new();
//!
//! // Keep the handler if you want to remove it by identity later
//! let log_login = Handler::new(|payload: &serde_json::Value| {
//!     println!("login: {}", payload);
//! });
//! let subscription = bus.subscribe("user:login", log_login.clone()).unwrap();
//!
//! bus.publish("user:login", json!({ "id": 1 })).unwrap();
//!
//! // Either of these removes it; the second is then a no-op
//! subscription.dispose();
//! bus.unsubscribe("user:login", &log_login).unwrap();
//! ```

mod bus;
mod envelope;
mod handler;
mod subscription;
mod typed;

pub use bus::*;
pub use envelope::Envelope;
pub use handler::Handler;
pub use subscription::{Subscription, SubscriptionId, SubscriptionState};
pub use typed::TypedTopic;
