//! Envelope type seen by tap receivers.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// A published event as observed through [`EventBus::tap`](super::EventBus::tap)
///
/// The payload is shared with the handlers that received it, so an envelope
/// can be cloned for every tap receiver without cloning the payload itself.
pub struct Envelope<P> {
    /// Topic the payload was published on.
    pub topic: String,
    /// The published payload.
    pub payload: Arc<P>,
    /// Number of handlers the payload was delivered to.
    pub delivered: usize,
    /// When `publish` was called.
    pub published_at: DateTime<Utc>,
}

impl<P> Clone for Envelope<P> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            payload: Arc::clone(&self.payload),
            delivered: self.delivered,
            published_at: self.published_at,
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for Envelope<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("topic", &self.topic)
            .field("payload", &self.payload)
            .field("delivered", &self.delivered)
            .field("published_at", &self.published_at)
            .finish()
    }
}
