//! The deferred event queue: a per-event-type append-only queue of owned
//! values plus a per-type list of listeners, drained in one pass. Fans
//! listeners out immediately at `dispatch_event_queue` rather than on a
//! frame-delayed buffer swap.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Marker trait for event payload types, implemented via
/// `#[derive(Event)]` or by hand.
pub trait Event: 'static {}

trait ErasedQueue {
    fn dispatch(&mut self);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedQueue<E: Event> {
    queue: Vec<E>,
    listeners: Vec<Box<dyn FnMut(&E)>>,
}

impl<E: Event> ErasedQueue for TypedQueue<E> {
    fn dispatch(&mut self) {
        for value in self.queue.drain(..) {
            for listener in &mut self.listeners {
                listener(&value);
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owns every registered event type's queue and listener list.
#[derive(Default)]
pub(crate) struct Queues {
    by_type: HashMap<TypeId, Box<dyn ErasedQueue>>,
}

impl Queues {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn typed_mut<E: Event>(&mut self) -> &mut TypedQueue<E> {
        let entry = self
            .by_type
            .entry(TypeId::of::<E>())
            .or_insert_with(|| {
                Box::new(TypedQueue::<E> {
                    queue: Vec::new(),
                    listeners: Vec::new(),
                })
            });
        entry
            .as_any_mut()
            .downcast_mut::<TypedQueue<E>>()
            .expect("event type erasure invariant: TypeId key matches stored concrete type")
    }

    pub(crate) fn register_listener<E: Event>(&mut self, listener: impl FnMut(&E) + 'static) {
        self.typed_mut::<E>().listeners.push(Box::new(listener));
    }

    pub(crate) fn send_event<E: Event>(&mut self, value: E) {
        self.typed_mut::<E>().queue.push(value);
    }

    /// Drains every event type's queue once, in registration order of the
    /// type's first use, invoking listeners in registration order.
    pub(crate) fn dispatch_all(&mut self) {
        for queue in self.by_type.values_mut() {
            queue.dispatch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Damage {
        amount: u32,
    }
    impl Event for Damage {}

    #[derive(Debug, Clone, PartialEq)]
    struct Heal {
        amount: u32,
    }
    impl Event for Heal {}

    #[test]
    fn dispatch_invokes_listeners_in_send_order_then_drains() {
        // Given a listener registered for Damage
        let mut queues = Queues::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        queues.register_listener::<Damage>(move |event| sink.borrow_mut().push(event.amount));

        // When three events are sent before any dispatch
        queues.send_event(Damage { amount: 1 });
        queues.send_event(Damage { amount: 2 });
        queues.send_event(Damage { amount: 3 });

        // Then nothing has fired yet
        assert!(received.borrow().is_empty());

        // When dispatched once
        queues.dispatch_all();

        // Then the listener saw all three in send order
        assert_eq!(*received.borrow(), vec![1, 2, 3]);

        // And a second dispatch with an empty queue calls nothing
        queues.dispatch_all();
        assert_eq!(*received.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn event_type_with_no_listeners_still_drains() {
        // Given an event sent with no registered listener
        let mut queues = Queues::new();
        queues.send_event(Heal { amount: 5 });

        // When dispatched
        queues.dispatch_all();

        // Then a second dispatch with no new sends produces no panic
        queues.dispatch_all();
    }

    #[test]
    fn distinct_event_types_do_not_cross_fire() {
        // Given listeners on two distinct event types
        let mut queues = Queues::new();
        let damage_hits = Rc::new(RefCell::new(0));
        let heal_hits = Rc::new(RefCell::new(0));
        let d = damage_hits.clone();
        let h = heal_hits.clone();
        queues.register_listener::<Damage>(move |_| *d.borrow_mut() += 1);
        queues.register_listener::<Heal>(move |_| *h.borrow_mut() += 1);

        // When only a Damage event is sent and dispatched
        queues.send_event(Damage { amount: 1 });
        queues.dispatch_all();

        // Then only the Damage listener fired
        assert_eq!(*damage_hits.borrow(), 1);
        assert_eq!(*heal_hits.borrow(), 0);
    }
}
