//! Typed topics over a JSON-payload bus.
//!
//! A [`TypedTopic`] fixes the payload type for one topic name. Publishing
//! serializes the value into a `serde_json::Value`; subscribing deserializes
//! it back before calling the closure. A payload that does not fit the
//! subscriber's type is a handler failure, reported like any other.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

use super::bus::EventBus;
use super::handler::Handler;
use super::subscription::Subscription;
use crate::error::Result;

/// A topic name bound to a payload type
pub struct TypedTopic<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> TypedTopic<T> {
    /// Declare a typed topic, usually as a `const`
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    /// The underlying topic name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for TypedTopic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedTopic<T> {}

impl<T> fmt::Debug for TypedTopic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedTopic").field(&self.name).finish()
    }
}

impl<T> fmt::Display for TypedTopic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl<T: DeserializeOwned + 'static> TypedTopic<T> {
    /// Build a handler that decodes the payload into `T`
    ///
    /// Keep the returned handler to `unsubscribe` it later.
    pub fn handler<F>(&self, f: F) -> Handler<Value>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let name = self.name;
        Handler::fallible(move |payload: &Value| {
            let value = T::deserialize(payload).map_err(|e| {
                anyhow::anyhow!("payload on '{}' does not match subscriber type: {}", name, e)
            })?;
            f(value);
            Ok(())
        })
    }
}

impl EventBus<Value> {
    /// Serialize `payload` and publish it on `topic`
    pub fn publish_typed<T: Serialize>(&self, topic: &TypedTopic<T>, payload: &T) -> Result<usize> {
        let value = serde_json::to_value(payload)?;
        self.publish(topic.name(), value)
    }

    /// Subscribe a closure that receives the decoded payload
    pub fn subscribe_typed<T, F>(&self, topic: &TypedTopic<T>, f: F) -> Result<Subscription>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(topic.name(), topic.handler(f))
    }
}
