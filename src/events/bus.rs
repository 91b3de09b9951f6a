//! Event Bus
//!
//! A named slot holding an ordered list of asynchronous subscribers.
//! Handlers are compared by identity (`Arc` pointer), so the exact
//! handler instance passed to [`EventBus::add`] is needed to remove it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::error::{EngineError, Result};

/// Boxed future returned by every handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A subscriber callback.
pub type Handler<T> = Arc<dyn Fn(T) -> HandlerFuture + Send + Sync>;

/// Wraps an async closure into a [`Handler`].
///
/// # Example
///
/// ```
/// use eventflow::events::{handler, EventBus};
///
/// let bus: EventBus<u32> = EventBus::new("counter");
/// bus.add(handler(|n: u32| async move {
///     println!("got {}", n);
///     Ok(())
/// }));
/// assert_eq!(bus.len(), 1);
/// ```
pub fn handler<T, F, Fut>(f: F) -> Handler<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |payload: T| Box::pin(f(payload)) as HandlerFuture)
}

/// An event slot with its ordered subscribers.
pub struct EventBus<T> {
    id: String,
    handlers: Mutex<Vec<Handler<T>>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates an empty slot.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Event identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Handler<T>>> {
        // A panicking handler never runs under this lock, so poisoning
        // leaves the list intact.
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a handler.
    pub fn add(&self, handler: Handler<T>) {
        self.lock().push(handler);
    }

    /// Removes every registration of this exact handler instance.
    ///
    /// Returns true if something was removed.
    pub fn remove(&self, handler: &Handler<T>) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        before != handlers.len()
    }

    /// Drops all handlers.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Delivers `payload` to every handler registered when the call starts.
    ///
    /// Handlers run one after another, never concurrently. Changes to the
    /// handler list made during dispatch only affect later calls. A failing
    /// handler does not stop the pass; failures are reported afterwards as
    /// [`EngineError::HandlerFailed`].
    pub async fn trigger(&self, payload: T) -> Result<()> {
        let snapshot: Vec<Handler<T>> = self.lock().clone();
        debug!(
            "Dispatching event '{}' to {} handler(s)",
            self.id,
            snapshot.len()
        );

        let mut failed = 0;
        let mut first = None;

        for handler in snapshot {
            if let Err(e) = handler(payload.clone()).await {
                warn!("Handler for event '{}' failed: {}", self.id, e);
                failed += 1;
                first.get_or_insert(e);
            }
        }

        match first {
            None => Ok(()),
            Some(first) => Err(EngineError::HandlerFailed {
                event: self.id.clone(),
                failed,
                first: Box::new(first),
            }),
        }
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handlers.lock().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("EventBus")
            .field("id", &self.id)
            .field("handlers", &count)
            .finish()
    }
}
