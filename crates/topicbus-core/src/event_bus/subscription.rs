//! Subscription tokens and disposers.

use std::fmt;
use std::sync::Weak;
use uuid::Uuid;

/// Unique identifier of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Lifecycle of a registration. `Removed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Still registered and receiving publishes.
    Active,
    /// Removed by a disposer, `unsubscribe`, or a bulk clear.
    Removed,
}

/// Registry operations a disposer needs, independent of the payload type
pub(crate) trait Unregister: Send + Sync {
    fn remove(&self, topic: &str, id: SubscriptionId) -> bool;
    fn contains(&self, topic: &str, id: SubscriptionId) -> bool;
}

/// Disposer for exactly one registration
///
/// Returned by `EventBus::subscribe`. Dropping it does *not* unsubscribe;
/// the registration lives until [`dispose`](Self::dispose) or a matching
/// `unsubscribe`. Only a weak reference to the bus is kept.
#[derive(Clone)]
pub struct Subscription {
    topic: String,
    id: SubscriptionId,
    registry: Weak<dyn Unregister>,
}

impl Subscription {
    pub(crate) fn new(topic: String, id: SubscriptionId, registry: Weak<dyn Unregister>) -> Self {
        Self {
            topic,
            id,
            registry,
        }
    }

    /// Topic this registration belongs to
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Identifier of this registration
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove this registration
    ///
    /// Returns true if it was still registered. Calling it again, or after the
    /// bus is gone, is a no-op returning false.
    pub fn dispose(&self) -> bool {
        let removed = self
            .registry
            .upgrade()
            .is_some_and(|registry| registry.remove(&self.topic, self.id));
        if removed {
            tracing::debug!("Subscription {} on '{}' disposed", self.id, self.topic);
        }
        removed
    }

    /// Check whether the registration is still present
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(&self.topic, self.id))
    }

    /// Current lifecycle state
    pub fn state(&self) -> SubscriptionState {
        if self.is_active() {
            SubscriptionState::Active
        } else {
            SubscriptionState::Removed
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct FakeRegistry {
        live: Mutex<Vec<(String, SubscriptionId)>>,
    }

    impl Unregister for FakeRegistry {
        fn remove(&self, topic: &str, id: SubscriptionId) -> bool {
            let mut live = self.live.lock();
            let before = live.len();
            live.retain(|(t, i)| !(t == topic && *i == id));
            live.len() != before
        }

        fn contains(&self, topic: &str, id: SubscriptionId) -> bool {
            self.live.lock().iter().any(|(t, i)| t == topic && *i == id)
        }
    }

    fn registry_with(id: SubscriptionId) -> Arc<FakeRegistry> {
        Arc::new(FakeRegistry {
            live: Mutex::new(vec![("t".to_string(), id)]),
        })
    }

    #[test]
    fn test_subscription_id_display() {
        let id = SubscriptionId::new();
        let text = id.to_string();
        assert!(text.starts_with("Sub("));
        assert_eq!(text.len(), "Sub()".len() + 8);
        assert_ne!(id, SubscriptionId::new());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let id = SubscriptionId::new();
        let registry = registry_with(id);
        let weak: Weak<dyn Unregister> = Arc::downgrade(&registry) as Weak<dyn Unregister>;
        let sub = Subscription::new("t".to_string(), id, weak);

        assert_eq!(sub.state(), SubscriptionState::Active);
        assert!(sub.dispose());
        assert_eq!(sub.state(), SubscriptionState::Removed);
        assert!(!sub.dispose());
    }

    #[test]
    fn test_dispose_after_registry_dropped() {
        let id = SubscriptionId::new();
        let registry = registry_with(id);
        let weak: Weak<dyn Unregister> = Arc::downgrade(&registry) as Weak<dyn Unregister>;
        let sub = Subscription::new("t".to_string(), id, weak);
        drop(registry);

        assert!(!sub.is_active());
        assert!(!sub.dispose());
    }
}
