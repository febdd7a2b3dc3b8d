//! Event Bus implementation.
//!
//! Provides the core EventBus struct and global instance for
//! application-wide event distribution.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::broadcast;

use super::envelope::Envelope;
use super::handler::Handler;
use super::subscription::{Subscription, SubscriptionId, Unregister};
use crate::error::{BusError, HandlerError, Result};

/// Type alias for the handler-failure hook
type ErrorHook = dyn Fn(&HandlerError) + Send + Sync;

/// Largest tap channel capacity; larger configured values are clamped
pub const MAX_TAP_CAPACITY: usize = 1 << 16;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Capacity of the tap broadcast channel, `1..=MAX_TAP_CAPACITY`.
    pub tap_capacity: usize,
    /// Emit a `trace!` line for every handler invocation.
    pub trace_deliveries: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            tap_capacity: 1024,
            trace_deliveries: false,
        }
    }
}

/// One registration: a handler bound to a topic under a unique id
struct Entry<P> {
    id: SubscriptionId,
    handler: Handler<P>,
}

impl<P> Clone for Entry<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: self.handler.clone(),
        }
    }
}

/// Topic -> ordered registrations. Lock is never held while a handler runs.
struct Registry<P> {
    topics: RwLock<HashMap<String, Vec<Entry<P>>>>,
}

impl<P> Registry<P> {
    fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, topic: &str, entry: Entry<P>) {
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(entry);
    }

    fn snapshot(&self, topic: &str) -> Vec<Entry<P>> {
        self.topics.read().get(topic).cloned().unwrap_or_default()
    }

    /// Remove every registration of `topic` matching `pred`, pruning empty topics
    fn remove_where(&self, topic: &str, pred: impl Fn(&Entry<P>) -> bool) -> usize {
        let mut topics = self.topics.write();
        let Some(entries) = topics.get_mut(topic) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|e| !pred(e));
        let removed = before - entries.len();
        if entries.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    fn clear_topic(&self, topic: &str) -> usize {
        self.topics.write().remove(topic).map_or(0, |e| e.len())
    }

    fn clear(&self) -> usize {
        let mut topics = self.topics.write();
        let count = topics.values().map(Vec::len).sum();
        topics.clear();
        count
    }

    fn count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    fn total(&self) -> usize {
        self.topics.read().values().map(Vec::len).sum()
    }

    fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl<P: 'static> Unregister for Registry<P> {
    fn remove(&self, topic: &str, id: SubscriptionId) -> bool {
        self.remove_where(topic, |e| e.id == id) > 0
    }

    fn contains(&self, topic: &str, id: SubscriptionId) -> bool {
        self.topics
            .read()
            .get(topic)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(BusError::invalid_argument("topic must not be empty"));
    }
    Ok(())
}

/// Topic-based publish/subscribe bus
///
/// Cloning an `EventBus` yields another handle to the same registry, error
/// hook and tap. Independent buses are created with [`EventBus::new`].
pub struct EventBus<P = Value> {
    /// Registered handlers by topic
    registry: Arc<Registry<P>>,
    /// Receiver of handler failures, shared across clones
    error_hook: Arc<RwLock<Option<Arc<ErrorHook>>>>,
    /// Broadcast channel for tap receivers
    tap: broadcast::Sender<Envelope<P>>,
    /// Configuration
    config: EventBusConfig,
}

impl<P: Send + Sync + 'static> EventBus<P> {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (tap, _) = broadcast::channel(config.tap_capacity.clamp(1, MAX_TAP_CAPACITY));
        Self {
            registry: Arc::new(Registry::new()),
            error_hook: Arc::new(RwLock::new(None)),
            tap,
            config,
        }
    }

    /// Register `handler` under `topic`
    ///
    /// The handler is appended after any existing handlers for the topic.
    /// Subscribing the same handler twice creates two registrations.
    pub fn subscribe(&self, topic: &str, handler: Handler<P>) -> Result<Subscription> {
        validate_topic(topic)?;
        let id = SubscriptionId::new();
        match handler.name() {
            Some(name) => tracing::debug!("Subscription {} added on '{}' ({})", id, topic, name),
            None => tracing::debug!("Subscription {} added on '{}'", id, topic),
        }
        self.registry.insert(topic, Entry { id, handler });

        let registry: Weak<dyn Unregister> = Arc::downgrade(&self.registry) as Weak<dyn Unregister>;
        Ok(Subscription::new(topic.to_string(), id, registry))
    }

    /// Subscribe a closure; it can only be removed through the returned disposer
    pub fn on<F>(&self, topic: &str, f: F) -> Result<Subscription>
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.subscribe(topic, Handler::new(f))
    }

    /// Subscribe a fallible closure
    pub fn try_on<F>(&self, topic: &str, f: F) -> Result<Subscription>
    where
        F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(topic, Handler::fallible(f))
    }

    /// Deliver `payload` to every handler registered under `topic`
    ///
    /// Handlers run synchronously on the calling thread, in registration
    /// order, over a snapshot taken when the call starts. A handler that
    /// fails or panics is reported and skipped; the rest still run.
    ///
    /// Returns the number of handlers in the snapshot.
    pub fn publish(&self, topic: &str, payload: P) -> Result<usize> {
        validate_topic(topic)?;
        let snapshot = self.registry.snapshot(topic);
        let payload = Arc::new(payload);

        for entry in &snapshot {
            if self.config.trace_deliveries {
                tracing::trace!("Delivering '{}' to {}", topic, entry.id);
            }
            if let Err(kind) = entry.handler.invoke(&payload) {
                self.report(HandlerError {
                    topic: topic.to_string(),
                    subscription: entry.id,
                    handler: entry.handler.name().map(str::to_string),
                    kind,
                });
            }
        }

        if self.tap.receiver_count() > 0 {
            // Lagging or departed receivers are not the publisher's problem
            let _ = self.tap.send(Envelope {
                topic: topic.to_string(),
                payload,
                delivered: snapshot.len(),
                published_at: chrono::Utc::now(),
            });
        }

        Ok(snapshot.len())
    }

    /// Remove every registration of `handler` under `topic`
    ///
    /// Matches by handler identity. Returns the number of registrations
    /// removed; zero when the handler was not registered there.
    pub fn unsubscribe(&self, topic: &str, handler: &Handler<P>) -> Result<usize> {
        validate_topic(topic)?;
        let removed = self
            .registry
            .remove_where(topic, |e| e.handler.same_as(handler));
        if removed > 0 {
            tracing::debug!("Removed {} subscription(s) from '{}'", removed, topic);
        }
        Ok(removed)
    }

    /// Remove every registration under `topic`
    pub fn clear_topic(&self, topic: &str) -> Result<usize> {
        validate_topic(topic)?;
        let removed = self.registry.clear_topic(topic);
        tracing::debug!("Cleared {} subscription(s) from '{}'", removed, topic);
        Ok(removed)
    }

    /// Remove every registration on every topic
    pub fn dispose_all(&self) -> usize {
        let removed = self.registry.clear();
        tracing::debug!("Disposed all {} subscription(s)", removed);
        removed
    }

    /// Install the hook that receives handler failures
    ///
    /// Replaces any previous hook. Without a hook, failures are logged.
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&HandlerError) + Send + Sync + 'static,
    {
        *self.error_hook.write() = Some(Arc::new(hook));
    }

    /// Remove the error hook, falling back to logging
    pub fn clear_error_hook(&self) {
        *self.error_hook.write() = None;
    }

    /// Get a receiver that observes every publish on this bus
    ///
    /// Useful in async contexts for diagnostics. Receivers that fall behind
    /// by more than the tap capacity lose the oldest envelopes.
    pub fn tap(&self) -> broadcast::Receiver<Envelope<P>> {
        self.tap.subscribe()
    }

    /// Get the number of registrations under `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry.count(topic)
    }

    /// Get the number of registrations across all topics
    pub fn total_subscribers(&self) -> usize {
        self.registry.total()
    }

    /// Topics that currently have at least one registration, sorted
    pub fn topics(&self) -> Vec<String> {
        self.registry.topic_names()
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn report(&self, error: HandlerError) {
        let hook = self.error_hook.read().clone();
        let Some(hook) = hook else {
            tracing::warn!(
                topic = %error.topic,
                subscription = %error.subscription,
                handler = error.handler.as_deref().unwrap_or("<anonymous>"),
                "{}",
                error.kind
            );
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| hook(&error))).is_err() {
            tracing::error!("Error hook panicked while reporting: {}", error);
        }
    }
}

impl<P: Send + Sync + 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            error_hook: Arc::clone(&self.error_hook),
            tap: self.tap.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: Send + Sync + 'static> std::fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics())
            .field("subscribers", &self.total_subscribers())
            .field("config", &self.config)
            .finish()
    }
}

/// Global event bus instance
static EVENT_BUS: OnceLock<EventBus> = OnceLock::new();

/// Get or initialize the global event bus
///
/// Convenience for code that has no bus handed to it. Components that can
/// take an `EventBus` should, so tests can give them their own.
pub fn event_bus() -> &'static EventBus {
    EVENT_BUS.get_or_init(EventBus::new)
}

/// Initialize the global event bus with custom configuration
///
/// Must be called before any calls to `event_bus()`. Returns the config
/// back if the event bus has already been initialized.
pub fn init_event_bus(config: EventBusConfig) -> std::result::Result<(), EventBusConfig> {
    if EVENT_BUS.get().is_some() {
        return Err(config);
    }
    // Another thread may still win between the check and the set
    EVENT_BUS
        .set(EventBus::with_config(config))
        .map_err(|bus| bus.config.clone())
}

/// Convenience macro to publish a payload on the global event bus
///
/// The payload is converted with `Into<serde_json::Value>`.
#[macro_export]
macro_rules! emit {
    ($topic:expr, $payload:expr) => {
        $crate::event_bus::event_bus().publish($topic, ::core::convert::Into::into($payload))
    };
}

/// Convenience macro to subscribe a closure on the global event bus
#[macro_export]
macro_rules! on_event {
    ($topic:expr, $handler:expr) => {
        $crate::event_bus::event_bus().on($topic, $handler)
    };
}
