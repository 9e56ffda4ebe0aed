//! Fan-out of events to subscribed listeners.
//!
//! One [`EventMediator`] exists per running game and one for the server
//! scope. Publishing never blocks: listeners are channel senders that either
//! accept the event right away or report why they can't.

use log::{debug, warn};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::game::entities::PlayerId;

#[derive(Debug, Eq, Error, PartialEq)]
pub enum DeliveryError {
    #[error("listener is full")]
    Full,
    #[error("listener is closed")]
    Closed,
}

/// Something that accepts events without blocking.
pub trait Listener<E>: Send + Sync {
    fn deliver(&self, event: &E) -> Result<(), DeliveryError>;
}

impl<E, T> Listener<E> for mpsc::Sender<T>
where
    E: Clone,
    T: From<E> + Send,
{
    fn deliver(&self, event: &E) -> Result<(), DeliveryError> {
        self.try_send(T::from(event.clone())).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

impl<E, T> Listener<E> for mpsc::UnboundedSender<T>
where
    E: Clone,
    T: From<E> + Send,
{
    fn deliver(&self, event: &E) -> Result<(), DeliveryError> {
        self.send(T::from(event.clone()))
            .map_err(|_| DeliveryError::Closed)
    }
}

type Subscribers<E> = HashMap<PlayerId, Arc<dyn Listener<E>>>;

/// Subscriber map that is copied on write. `publish` walks a snapshot, so
/// subscribing or unsubscribing mid-publish affects the next publish only.
pub struct EventMediator<E> {
    name: String,
    listeners: RwLock<Arc<Subscribers<E>>>,
}

impl<E> EventMediator<E>
where
    E: fmt::Display,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Arc<Subscribers<E>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut Subscribers<E>)) {
        let mut guard = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut listeners = (**guard).clone();
        f(&mut listeners);
        *guard = Arc::new(listeners);
    }

    /// Replaces any listener already registered under `id`.
    pub fn subscribe(&self, id: PlayerId, listener: Arc<dyn Listener<E>>) {
        debug!("{}: {id} subscribed", self.name);
        self.update(|listeners| {
            listeners.insert(id, listener);
        });
    }

    /// Returns the listener that was registered under `id`, if any.
    pub fn unsubscribe(&self, id: PlayerId) -> Option<Arc<dyn Listener<E>>> {
        let mut removed = None;
        self.update(|listeners| removed = listeners.remove(&id));
        if removed.is_some() {
            debug!("{}: {id} unsubscribed", self.name);
        }
        removed
    }

    #[must_use]
    pub fn is_subscribed(&self, id: PlayerId) -> bool {
        self.snapshot().contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Deliver `event` to every listener and return how many accepted it.
    /// Failures are logged; closed listeners are dropped.
    pub fn publish(&self, event: &E) -> usize {
        let listeners = self.snapshot();
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, listener) in listeners.iter() {
            match listener.deliver(event) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Full) => {
                    warn!("{}: {id} is lagging, dropped \"{event}\"", self.name);
                }
                Err(DeliveryError::Closed) => closed.push((*id, Arc::clone(listener))),
            }
        }

        if !closed.is_empty() {
            self.update(|current| {
                for (id, listener) in &closed {
                    // Only drop it if nobody re-subscribed in the meantime.
                    if current.get(id).is_some_and(|l| Arc::ptr_eq(l, listener)) {
                        debug!("{}: dropping closed listener of {id}", self.name);
                        current.remove(id);
                    }
                }
            });
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct Ping(u32);

    impl fmt::Display for Ping {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ping {}", self.0)
        }
    }

    /// Subscribes another listener while it is being delivered to.
    struct Reentrant {
        mediator: Arc<EventMediator<Ping>>,
        seen: Mutex<Vec<u32>>,
        receivers: Mutex<Vec<mpsc::UnboundedReceiver<Ping>>>,
    }

    impl Listener<Ping> for Reentrant {
        fn deliver(&self, event: &Ping) -> Result<(), DeliveryError> {
            let (tx, rx) = mpsc::unbounded_channel::<Ping>();
            self.mediator.subscribe(PlayerId(99), Arc::new(tx));
            self.receivers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(rx);
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.0);
            Ok(())
        }
    }

    #[test]
    fn publish_reaches_every_listener() {
        let mediator = EventMediator::<Ping>::new("test");
        let (tx1, mut rx1) = mpsc::channel::<Ping>(4);
        let (tx2, mut rx2) = mpsc::unbounded_channel::<Ping>();
        mediator.subscribe(PlayerId(1), Arc::new(tx1));
        mediator.subscribe(PlayerId(2), Arc::new(tx2));

        assert_eq!(mediator.publish(&Ping(7)), 2);
        assert_eq!(rx1.try_recv().unwrap(), Ping(7));
        assert_eq!(rx2.try_recv().unwrap(), Ping(7));
    }

    #[test]
    fn closed_listener_is_dropped_and_others_still_served() {
        let mediator = EventMediator::<Ping>::new("test");
        let (tx1, rx1) = mpsc::channel::<Ping>(4);
        let (tx2, mut rx2) = mpsc::channel::<Ping>(4);
        mediator.subscribe(PlayerId(1), Arc::new(tx1));
        mediator.subscribe(PlayerId(2), Arc::new(tx2));
        drop(rx1);

        assert_eq!(mediator.publish(&Ping(1)), 1);
        assert_eq!(rx2.try_recv().unwrap(), Ping(1));
        assert!(!mediator.is_subscribed(PlayerId(1)));
        assert_eq!(mediator.len(), 1);
    }

    #[test]
    fn full_listener_is_kept() {
        let mediator = EventMediator::<Ping>::new("test");
        let (tx, mut rx) = mpsc::channel::<Ping>(1);
        mediator.subscribe(PlayerId(1), Arc::new(tx));
        assert_eq!(mediator.publish(&Ping(1)), 1);
        assert_eq!(mediator.publish(&Ping(2)), 0);
        assert!(mediator.is_subscribed(PlayerId(1)));
        assert_eq!(rx.try_recv().unwrap(), Ping(1));
        assert_eq!(mediator.publish(&Ping(3)), 1);
    }

    #[test]
    fn subscribing_during_publish_waits_for_next_publish() {
        let mediator = Arc::new(EventMediator::<Ping>::new("test"));
        let reentrant = Arc::new(Reentrant {
            mediator: Arc::clone(&mediator),
            seen: Mutex::new(Vec::new()),
            receivers: Mutex::new(Vec::new()),
        });
        mediator.subscribe(PlayerId(1), reentrant.clone());

        assert_eq!(mediator.publish(&Ping(1)), 1);
        assert!(mediator.is_subscribed(PlayerId(99)));
        assert_eq!(mediator.publish(&Ping(2)), 2);
        assert_eq!(*reentrant.seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unsubscribe_returns_listener() {
        let mediator = EventMediator::<Ping>::new("test");
        let (tx, _rx) = mpsc::unbounded_channel::<Ping>();
        mediator.subscribe(PlayerId(5), Arc::new(tx));
        assert!(mediator.unsubscribe(PlayerId(5)).is_some());
        assert!(mediator.unsubscribe(PlayerId(5)).is_none());
        assert!(mediator.is_empty());
    }
}
