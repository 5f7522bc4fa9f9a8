use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::error;

use crate::error::EventError;

/// Implemented by the event enum a particular [`EventBus`] carries. `kind`
/// is the dispatch key handlers subscribe to (e.g. `"task:completed"`).
pub trait EventKindOf {
    fn kind(&self) -> &'static str;
}

type HandlerFn<E> = dyn Fn(&E) -> Result<(), EventError> + Send + Sync;

struct Subscription<E> {
    name: String,
    priority: i32,
    registration_order: usize,
    kind: &'static str,
    handler: Box<HandlerFn<E>>,
}

/// Priority-ordered, single-threaded cooperative publish/subscribe bus
/// (spec §4.5). Dispatch sorts matching subscribers by descending priority,
/// ties broken by registration order; handlers run to completion
/// synchronously and a failing handler never aborts the rest.
pub struct EventBus<E: EventKindOf> {
    subscriptions: Mutex<Vec<Arc<Subscription<E>>>>,
    next_order: AtomicUsize,
}

impl<E: EventKindOf> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EventKindOf> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            next_order: AtomicUsize::new(0),
        }
    }

    /// Register a handler for the given event kind.
    pub fn on(
        &self,
        kind: &'static str,
        name: impl Into<String>,
        priority: i32,
        handler: impl Fn(&E) -> Result<(), EventError> + Send + Sync + 'static,
    ) {
        let registration_order = self.next_order.fetch_add(1, Ordering::SeqCst);
        let subscription = Subscription {
            name: name.into(),
            priority,
            registration_order,
            kind,
            handler: Box::new(handler),
        };
        self.subscriptions
            .lock()
            .expect("event bus lock poisoned")
            .push(Arc::new(subscription));
    }

    /// Dispatch an event to every matching handler in priority order.
    ///
    /// Subscriptions are snapshotted and the lock is released before any
    /// handler runs, so a handler is free to call `emit`/`on` again
    /// (e.g. an `xp:awarded` emission from inside a `task:completed`
    /// handler) without deadlocking.
    pub fn emit(&self, event: E) {
        let kind = event.kind();
        let mut matched: Vec<Arc<Subscription<E>>> = {
            let subs = self.subscriptions.lock().expect("event bus lock poisoned");
            subs.iter().filter(|s| s.kind == kind).cloned().collect()
        };
        matched.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.registration_order.cmp(&b.registration_order))
        });

        for subscription in matched {
            if let Err(err) = (subscription.handler)(&event) {
                error!(
                    handler = %subscription.name,
                    kind,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }

    /// Number of subscriptions currently registered for `kind` (test/debug
    /// helper).
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.subscriptions
            .lock()
            .expect("event bus lock poisoned")
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Clone)]
    enum TestEvent {
        Ping,
    }

    impl EventKindOf for TestEvent {
        fn kind(&self) -> &'static str {
            match self {
                TestEvent::Ping => "ping",
            }
        }
    }

    #[test]
    fn dispatches_in_priority_then_registration_order() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let o1 = order.clone();
        bus.on("ping", "low", 0, move |_| {
            o1.lock().unwrap().push("low");
            Ok(())
        });
        let o2 = order.clone();
        bus.on("ping", "high", 10, move |_| {
            o2.lock().unwrap().push("high");
            Ok(())
        });
        let o3 = order.clone();
        bus.on("ping", "high-second", 10, move |_| {
            o3.lock().unwrap().push("high-second");
            Ok(())
        });

        bus.emit(TestEvent::Ping);

        assert_eq!(*order.lock().unwrap(), vec!["high", "high-second", "low"]);
    }

    #[test]
    fn failing_handler_does_not_abort_dispatch() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let ran = Arc::new(StdMutex::new(false));

        bus.on("ping", "failing", 10, |_| Err(EventError::new("boom")));
        let ran2 = ran.clone();
        bus.on("ping", "succeeding", 0, move |_| {
            *ran2.lock().unwrap() = true;
            Ok(())
        });

        bus.emit(TestEvent::Ping);
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn reentrant_emit_from_within_a_handler_does_not_deadlock() {
        let bus: Arc<EventBus<TestEvent>> = Arc::new(EventBus::new());
        let inner_ran = Arc::new(StdMutex::new(false));
        let reentered = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let bus_clone = bus.clone();
        let reentered_clone = reentered.clone();
        bus.on("ping", "outer", 10, move |_| {
            if !reentered_clone.swap(true, Ordering::SeqCst) {
                bus_clone.emit(TestEvent::Ping);
            }
            Ok(())
        });
        let inner_ran2 = inner_ran.clone();
        bus.on("ping", "inner-marker", 0, move |_| {
            *inner_ran2.lock().unwrap() = true;
            Ok(())
        });

        bus.emit(TestEvent::Ping);
        assert!(*inner_ran.lock().unwrap());
    }
}
