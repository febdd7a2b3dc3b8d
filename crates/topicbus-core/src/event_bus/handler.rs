//! Handler type.
//!
//! A [`Handler`] owns its callable behind an `Arc`, and that allocation is
//! the handler's identity: clones compare equal, two handlers built from
//! identical closures do not. The bus never re-wraps a handler once it has
//! been constructed, so the value given to `subscribe` is the value
//! `unsubscribe` matches against.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::HandlerErrorKind;

/// Signature every handler is stored as
type HandlerFn<P> = dyn Fn(&P) -> anyhow::Result<()> + Send + Sync;

/// A subscriber callback invoked with a payload reference
pub struct Handler<P> {
    func: Arc<HandlerFn<P>>,
    name: Option<Arc<str>>,
}

impl<P> Handler<P> {
    /// Create a handler from an infallible closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        Self::fallible(move |payload: &P| {
            f(payload);
            Ok(())
        })
    }

    /// Create a handler from a closure that can fail
    ///
    /// An `Err` is reported as a handler failure and does not stop delivery
    /// to the remaining handlers.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(f),
            name: None,
        }
    }

    /// Attach a diagnostic name used in logs and [`HandlerError`](crate::HandlerError)s
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(Arc::from(name.into()));
        self
    }

    /// Diagnostic name, if one was attached
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check whether two handlers are the same handler (not merely equivalent)
    pub fn same_as(&self, other: &Handler<P>) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }

    /// Run the handler, converting errors and panics into a failure kind
    pub(crate) fn invoke(&self, payload: &P) -> Result<(), HandlerErrorKind> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(payload))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(HandlerErrorKind::Failed(format!("{:#}", err))),
            Err(panic_err) => Err(HandlerErrorKind::Panicked(panic_message(&*panic_err))),
        }
    }
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<P> Clone for Handler<P> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            name: self.name.clone(),
        }
    }
}

impl<P> PartialEq for Handler<P> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<P> Eq for Handler<P> {}

impl<P> fmt::Debug for Handler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("ptr", &Arc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_clone_is_same_handler() {
        let h = Handler::<u32>::new(|_| {});
        let h2 = h.clone();
        assert!(h.same_as(&h2));
        assert_eq!(h, h2);
    }

    #[test]
    fn test_identical_closures_are_distinct() {
        let a = Handler::<u32>::new(|_| {});
        let b = Handler::<u32>::new(|_| {});
        assert!(!a.same_as(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_with_name_keeps_identity() {
        let h = Handler::<u32>::new(|_| {});
        let probe = h.clone();
        let named = h.with_name("logLogin");
        assert_eq!(named.name(), Some("logLogin"));
        assert!(named.same_as(&probe));
    }

    #[test]
    fn test_invoke_passes_payload() {
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let h = Handler::new(move |v: &usize| {
            s.store(*v, Ordering::SeqCst);
        });
        assert!(h.invoke(&7).is_ok());
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_invoke_reports_error() {
        let h = Handler::<u32>::fallible(|_| Err(anyhow::anyhow!("nope")));
        assert_eq!(
            h.invoke(&1),
            Err(HandlerErrorKind::Failed("nope".to_string()))
        );
    }

    #[test]
    fn test_invoke_catches_panic() {
        let h = Handler::<u32>::new(|v| panic!("bad value {}", v));
        assert_eq!(
            h.invoke(&3),
            Err(HandlerErrorKind::Panicked("bad value 3".to_string()))
        );

        let h = Handler::<u32>::new(|_| panic!("static message"));
        assert_eq!(
            h.invoke(&3),
            Err(HandlerErrorKind::Panicked("static message".to_string()))
        );
    }
}
