//! Error handling for topicbus
//!
//! Two families of errors exist:
//! - [`BusError`] is returned synchronously to the caller of a bus operation
//!   (bad arguments, payload encoding for typed topics).
//! - [`HandlerError`] describes a handler that failed during delivery. It is
//!   never returned to the publisher; the bus reports it through the error
//!   hook or the log and keeps delivering.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::event_bus::SubscriptionId;

/// Error returned by bus operations
#[derive(Error, Debug)]
pub enum BusError {
    /// An argument was rejected at call time
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// A typed payload could not be converted to the bus payload type
    #[error("Payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

impl BusError {
    /// Create an invalid-argument error from a message
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        BusError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Check if this is an invalid-argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, BusError::InvalidArgument { .. })
    }
}

/// How a handler failed during delivery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerErrorKind {
    /// The handler returned an error
    #[error("handler returned an error: {0}")]
    Failed(String),

    /// The handler panicked
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// A handler failure isolated by the bus during `publish`
#[derive(Error, Debug, Clone)]
#[error("Handler {} on topic '{topic}' ({subscription}) failed: {kind}", .handler.as_deref().unwrap_or("<anonymous>"))]
pub struct HandlerError {
    /// Topic that was being published.
    pub topic: String,
    /// Registration whose handler failed.
    pub subscription: SubscriptionId,
    /// Diagnostic name of the handler, if it has one.
    pub handler: Option<String>,
    /// What went wrong.
    pub kind: HandlerErrorKind,
}

impl HandlerError {
    /// Check if the handler panicked rather than returning an error
    pub fn is_panic(&self) -> bool {
        matches!(self.kind, HandlerErrorKind::Panicked(_))
    }
}

/// Result type using BusError
pub type Result<T> = std::result::Result<T, BusError>;
