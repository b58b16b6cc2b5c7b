#![forbid(unsafe_code)]

//! Typed publish/subscribe bus.
//!
//! Replaces ad-hoc DOM custom events: page scripts and the application
//! subscribe to [`Signal`](vitrine_widgets::Signal)s by type instead of by
//! event-name string.
//!
//! # Architecture
//!
//! The bus stores subscribers as `Weak` callbacks. The strong reference lives
//! in the [`Subscription`] returned by [`EventBus::subscribe`], so dropping the
//! subscription is the only way to unsubscribe. Dead entries are pruned
//! lazily during publish.
//!
//! # Invariants
//!
//! 1. Subscribers are called in registration order.
//! 2. A subscription dropped before `publish` is never called by it.
//! 3. Subscribing or dropping subscriptions from inside a callback is allowed;
//!    the change takes effect on the next publish.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<M> = dyn Fn(&M);

struct Inner<M> {
    subscribers: Vec<Weak<Callback<M>>>,
    published: u64,
}

/// Single-threaded message bus.
pub struct EventBus<M> {
    inner: Rc<RefCell<Inner<M>>>,
}

impl<M> Clone for EventBus<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: 'static> Default for EventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for EventBus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("subscribers", &inner.subscribers.len())
            .field("published", &inner.published)
            .finish()
    }
}

impl<M: 'static> EventBus<M> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                subscribers: Vec::new(),
                published: 0,
            })),
        }
    }

    /// Register `callback`. It stays registered while the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&M) + 'static) -> Subscription {
        let strong: Rc<Callback<M>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `message` to every live subscriber.
    pub fn publish(&self, message: &M) {
        let live: Vec<Rc<Callback<M>>> = {
            let mut inner = self.inner.borrow_mut();
            inner.published += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(message);
        }
    }

    /// Live subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Number of messages published so far.
    pub fn published(&self) -> u64 {
        self.inner.borrow().published
    }
}

/// RAII handle for a bus subscription.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Holds several subscriptions and releases them together.
#[derive(Debug, Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Drop every held subscription, newest first.
    pub fn clear(&mut self) {
        while self.subscriptions.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&log), Rc::clone(&log));
        let _s1 = bus.subscribe(move |m| a.borrow_mut().push(("first", *m)));
        let _s2 = bus.subscribe(move |m| b.borrow_mut().push(("second", *m)));
        bus.publish(&7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
        assert_eq!(bus.published(), 1);
    }

    #[test]
    fn default_bus_is_empty() {
        let bus: EventBus<String> = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.published(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = EventBus::<()>::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = bus.subscribe(move |_| h.set(h.get() + 1));
        bus.publish(&());
        drop(sub);
        bus.publish(&());
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscribing_during_publish_is_deferred() {
        let bus = EventBus::<u8>::new();
        let hits = Rc::new(Cell::new(0));
        let late: Rc<RefCell<Vec<Subscription>>> = Rc::default();
        let (bus2, hits2, late2) = (bus.clone(), Rc::clone(&hits), Rc::clone(&late));
        let _outer = bus.subscribe(move |_| {
            let h = Rc::clone(&hits2);
            late2
                .borrow_mut()
                .push(bus2.subscribe(move |_| h.set(h.get() + 1)));
        });
        bus.publish(&1);
        assert_eq!(hits.get(), 0);
        bus.publish(&2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn scope_releases_everything() {
        let bus = EventBus::<()>::new();
        let mut scope = SubscriptionScope::new();
        scope.hold(bus.subscribe(|_| {}));
        scope.hold(bus.subscribe(|_| {}));
        assert_eq!(bus.subscriber_count(), 2);
        scope.clear();
        assert!(scope.is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
