//! Listeners and channel-backed subscriptions.
//!
//! A [`Listener`] is a pair of callbacks: `on_event` for every matching event
//! and an optional `on_error`, invoked once when the hub drops the listener
//! because of a disconnect. Whether `on_error` is present also decides how
//! registration behaves on a disconnected hub (see
//! [`EventHub::register_block_event`](crate::EventHub::register_block_event)).
//!
//! [`Listener::channel`] adapts the callbacks to async code: events arrive on
//! an unbounded queue and the terminal error on a one-shot.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::error::HubError;

type EventFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(HubError) + Send + Sync>;

/// Callbacks registered with the hub for events of type `T`.
pub struct Listener<T> {
    on_event: EventFn<T>,
    on_error: Option<ErrorFn>,
}

impl<T> Listener<T> {
    pub fn new(on_event: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            on_event: Box::new(on_event),
            on_error: None,
        }
    }

    /// Attach an error callback.
    pub fn on_error(mut self, on_error: impl Fn(HubError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }

    pub(crate) fn deliver(&self, event: T) {
        (self.on_event)(event)
    }

    pub(crate) fn fail(&self, error: HubError) {
        if let Some(on_error) = &self.on_error {
            on_error(error);
        }
    }
}

impl<T: Send + 'static> Listener<T> {
    /// A listener wired to a [`Subscription`]. Always has an error path.
    pub fn channel() -> (Self, Subscription<T>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = oneshot::channel();

        let event_tx = Arc::new(Mutex::new(Some(event_tx)));
        let closer = Arc::clone(&event_tx);
        let closed_tx = Mutex::new(Some(closed_tx));

        let listener = Listener::new(move |event| {
            if let Some(tx) = event_tx.lock().as_ref() {
                let _ = tx.send(event);
            }
        })
        .on_error(move |error| {
            // Ends the event queue so `next()` drains and then yields `None`.
            closer.lock().take();
            if let Some(tx) = closed_tx.lock().take() {
                let _ = tx.send(error);
            }
        });

        let subscription = Subscription {
            events: event_rx,
            closed: Some(closed_rx),
            error: None,
        };
        (listener, subscription)
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("has_error_handler", &self.has_error_handler())
            .finish()
    }
}

/// Receiving side of [`Listener::channel`].
#[derive(Debug)]
pub struct Subscription<T> {
    events: mpsc::UnboundedReceiver<T>,
    closed: Option<oneshot::Receiver<HubError>>,
    error: Option<HubError>,
}

impl<T> Subscription<T> {
    /// Next event. Returns `None` once the listener was dropped by the hub
    /// and every queued event has been consumed.
    pub async fn next(&mut self) -> Option<T> {
        self.events.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_next(&mut self) -> Option<T> {
        self.events.try_recv().ok()
    }

    /// Resolves with the error that ended the subscription, or `None` if the
    /// listener was unregistered and dropped without one.
    pub async fn closed(&mut self) -> Option<HubError> {
        if let Some(rx) = self.closed.as_mut() {
            self.error = rx.await.ok();
            self.closed = None;
        }
        self.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn error_callback_is_optional() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let listener = Listener::new(move |n: usize| {
            counter.fetch_add(n, Ordering::SeqCst);
        });
        assert!(!listener.has_error_handler());
        listener.deliver(2);
        listener.fail(HubError::Shutdown);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn channel_delivers_then_closes() {
        let (listener, mut sub) = Listener::<u32>::channel();
        assert!(listener.has_error_handler());
        listener.deliver(1);
        listener.deliver(2);
        listener.fail(HubError::Shutdown);
        listener.deliver(3);

        assert_eq!(sub.next().await, Some(1));
        assert_eq!(sub.try_next(), Some(2));
        assert_eq!(sub.next().await, None);
        assert!(sub.closed().await.unwrap().is_shutdown());
        assert!(sub.closed().await.unwrap().is_shutdown());
    }

    #[tokio::test]
    async fn dropped_listener_closes_without_error() {
        let (listener, mut sub) = Listener::<u32>::channel();
        drop(listener);
        assert!(sub.closed().await.is_none());
        assert_eq!(sub.next().await, None);
    }
}
