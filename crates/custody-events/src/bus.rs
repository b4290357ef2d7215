// bus.rs — In-memory publish/subscribe registry.
//
// Delivery is synchronous and depth-first: `publish` returns only after every
// handler for that kind has returned, and a handler that publishes a
// downstream event has that event fully delivered before it continues.
// The handler list is snapshotted before delivery, so re-entrant publishing
// and subscribing from inside a handler never deadlock.

use std::sync::{Arc, RwLock};

use crate::event::{DiscoveredItem, EventKind, VerifiedItem};

/// Something that reacts to one kind of event.
///
/// Handlers own their error boundary: a failure inside `handle` must be
/// logged there. The bus neither sees nor aggregates outcomes.
pub trait Handler<E>: Send + Sync {
    fn handle(&self, event: &E);
}

impl<E, F> Handler<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn handle(&self, event: &E) {
        self(event)
    }
}

/// Ordered handler list for one event kind.
pub type Subscribers<E> = RwLock<Vec<Arc<dyn Handler<E>>>>;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::DiscoveredItem {}
    impl Sealed for super::VerifiedItem {}
}

/// A payload type that can travel over the bus.
///
/// Implemented only for the pipeline's payloads; each maps to one
/// [`EventKind`] and one subscriber slot.
pub trait Event: sealed::Sealed + Send + Sync + Sized + 'static {
    const KIND: EventKind;

    #[doc(hidden)]
    fn subscribers(bus: &EventBus) -> &Subscribers<Self>;
}

impl Event for DiscoveredItem {
    const KIND: EventKind = EventKind::Discovered;

    fn subscribers(bus: &EventBus) -> &Subscribers<Self> {
        &bus.discovered
    }
}

impl Event for VerifiedItem {
    const KIND: EventKind = EventKind::Verified;

    fn subscribers(bus: &EventBus) -> &Subscribers<Self> {
        &bus.verified
    }
}

/// Typed event bus with one ordered subscriber list per [`EventKind`].
#[derive(Default)]
pub struct EventBus {
    discovered: Subscribers<DiscoveredItem>,
    verified: Subscribers<VerifiedItem>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `E`. Handlers run in registration order.
    pub fn subscribe<E: Event>(&self, handler: Arc<dyn Handler<E>>) {
        let mut slot = match E::subscribers(self).write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.push(handler);
        tracing::debug!(kind = E::KIND.as_str(), position = slot.len(), "handler subscribed");
    }

    /// Deliver `event` to every handler subscribed to its kind, in order.
    ///
    /// Publishing a kind nobody listens to is a no-op.
    pub fn publish<E: Event>(&self, event: &E) {
        let handlers = self.snapshot::<E>();
        if handlers.is_empty() {
            tracing::trace!(kind = E::KIND.as_str(), "no subscribers");
            return;
        }
        for handler in &handlers {
            handler.handle(event);
        }
    }

    /// Number of handlers currently registered for `E`.
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.snapshot::<E>().len()
    }

    fn snapshot<E: Event>(&self) -> Vec<Arc<dyn Handler<E>>> {
        match E::subscribers(self).read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn item(name: &str) -> DiscoveredItem {
        DiscoveredItem::new(format!("/watch/{}", name))
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(&item("a.txt"));
        assert_eq!(bus.subscriber_count::<DiscoveredItem>(), 0);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe::<DiscoveredItem>(Arc::new(move |_: &DiscoveredItem| {
                order.lock().unwrap().push(tag);
            }));
        }

        bus.publish(&item("a.txt"));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn every_handler_sees_the_same_payload() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            bus.subscribe::<DiscoveredItem>(Arc::new(move |e: &DiscoveredItem| {
                seen.lock().unwrap().push(e as *const DiscoveredItem as usize);
            }));
        }

        let payload = item("evidence.bin");
        bus.publish(&payload);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[0], &payload as *const DiscoveredItem as usize);
    }

    #[test]
    fn kinds_are_delivered_independently() {
        let bus = EventBus::new();
        let discovered = Arc::new(AtomicUsize::new(0));
        let verified = Arc::new(AtomicUsize::new(0));

        let d = Arc::clone(&discovered);
        bus.subscribe::<DiscoveredItem>(Arc::new(move |_: &DiscoveredItem| {
            d.fetch_add(1, Ordering::SeqCst);
        }));
        let v = Arc::clone(&verified);
        bus.subscribe::<VerifiedItem>(Arc::new(move |_: &VerifiedItem| {
            v.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(&item("a.txt"));
        bus.publish(&item("b.txt"));

        assert_eq!(discovered.load(Ordering::SeqCst), 2);
        assert_eq!(verified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_can_publish_downstream() {
        let bus = Arc::new(EventBus::new());
        let verified = Arc::new(Mutex::new(Vec::new()));

        let downstream = Arc::clone(&bus);
        bus.subscribe::<DiscoveredItem>(Arc::new(move |e: &DiscoveredItem| {
            downstream.publish(&VerifiedItem {
                path: e.path.clone(),
                digest: "00".repeat(32),
                size_bytes: 0,
                modified: e.discovered_at,
            });
        }));
        let sink = Arc::clone(&verified);
        bus.subscribe::<VerifiedItem>(Arc::new(move |e: &VerifiedItem| {
            sink.lock().unwrap().push(e.file_name());
        }));

        bus.publish(&item("chained.txt"));
        assert_eq!(*verified.lock().unwrap(), vec!["chained.txt".to_string()]);
    }
}
