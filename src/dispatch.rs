//! Type-keyed pub/sub registry and dispatcher
//!
//! Maps message kinds (plus the wildcard key `*`) to ordered handler lists.
//! Dispatch runs exact-kind handlers first, then wildcard handlers, each in
//! registration order. A panicking handler is caught and logged; it cannot
//! affect later handlers or the connection. Heartbeat replies (`pong`) are
//! absorbed before any handler runs.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::core::message::{kinds, Message};

/// Handler invoked for each delivered message of a subscribed kind
pub type Handler = dyn Fn(&Message) + Send + Sync + 'static;

/// Registry shared between the client handle and the event-loop task
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Subscription registry: kind -> ordered handler list
///
/// A slot whose last handler is removed is pruned entirely, so an
/// unsubscribe-heavy workload cannot grow the map with empty entries.
#[derive(Default)]
pub struct Registry {
    slots: HashMap<String, Vec<(Uuid, Arc<Handler>)>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a kind, returning its id
    pub fn insert(&mut self, kind: &str, handler: Arc<Handler>) -> Uuid {
        let id = Uuid::new_v4();
        self.slots
            .entry(kind.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove exactly one handler from exactly one kind's slot
    ///
    /// Prunes the slot if it becomes empty. Returns whether a handler was
    /// removed.
    pub fn remove(&mut self, kind: &str, id: Uuid) -> bool {
        let Some(slot) = self.slots.get_mut(kind) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|(handler_id, _)| *handler_id != id);
        let removed = slot.len() < before;
        if slot.is_empty() {
            self.slots.remove(kind);
        }
        removed
    }

    /// Number of handlers registered under a kind
    pub fn handler_count(&self, kind: &str) -> usize {
        self.slots.get(kind).map(Vec::len).unwrap_or(0)
    }

    /// Number of kinds with at least one handler
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Snapshot the handlers a message of `kind` must reach, in delivery
    /// order: exact kind first, then wildcard
    fn snapshot_for(&self, kind: &str) -> Vec<Arc<Handler>> {
        let mut handlers: Vec<Arc<Handler>> = Vec::new();
        if let Some(slot) = self.slots.get(kind) {
            handlers.extend(slot.iter().map(|(_, h)| Arc::clone(h)));
        }
        if kind != kinds::WILDCARD {
            if let Some(slot) = self.slots.get(kinds::WILDCARD) {
                handlers.extend(slot.iter().map(|(_, h)| Arc::clone(h)));
            }
        }
        handlers
    }
}

/// Register a handler and return its subscription handle
pub fn subscribe(
    registry: &SharedRegistry,
    kind: &str,
    handler: impl Fn(&Message) + Send + Sync + 'static,
) -> Subscription {
    let id = registry.write().insert(kind, Arc::new(handler));
    Subscription {
        id,
        kind: kind.to_string(),
        registry: Arc::downgrade(registry),
    }
}

/// Deliver a message to its subscribers
///
/// Handlers are snapshotted under the lock and invoked outside it, so a
/// handler may subscribe or unsubscribe without deadlocking; the change takes
/// effect from the next dispatch cycle. Returns the number of handlers
/// invoked.
pub fn dispatch(registry: &SharedRegistry, msg: &Message) -> usize {
    // Liveness reply, not application data: reaches no handler
    if msg.kind == kinds::PONG {
        return 0;
    }

    let handlers = registry.read().snapshot_for(&msg.kind);
    for handler in &handlers {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (**handler)(msg))) {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(kind = %msg.kind, panic = %detail, "Subscriber panicked during dispatch");
        }
    }
    handlers.len()
}

/// Handle for one registered subscriber
///
/// Removal is explicit: dropping the handle leaves the handler registered
/// for the lifetime of the client.
pub struct Subscription {
    id: Uuid,
    kind: String,
    registry: Weak<RwLock<Registry>>,
}

impl Subscription {
    /// Kind this subscription was registered under
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Remove this handler from the registry
    ///
    /// Takes effect before the next dispatch cycle. A no-op if the client
    /// has already been torn down.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.write().remove(&self.kind, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn new_registry() -> SharedRegistry {
        Arc::new(RwLock::new(Registry::new()))
    }

    fn msg(kind: &str) -> Message {
        Message::new(kind, serde_json::json!({}))
    }

    #[test]
    fn test_type_isolation() {
        let registry = new_registry();
        let foo_hits = Arc::new(AtomicUsize::new(0));
        let star_hits = Arc::new(AtomicUsize::new(0));

        let counter = foo_hits.clone();
        let _foo = subscribe(&registry, "foo", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = star_hits.clone();
        let _star = subscribe(&registry, kinds::WILDCARD, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dispatch(&registry, &msg("foo"));
        dispatch(&registry, &msg("bar"));

        // "foo" handler never sees "bar"; the wildcard sees both
        assert_eq!(foo_hits.load(Ordering::SeqCst), 1);
        assert_eq!(star_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exact_handlers_run_before_wildcard_in_order() {
        let registry = new_registry();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = order.clone();
        let _star = subscribe(&registry, kinds::WILDCARD, move |_| {
            log.lock().unwrap().push("star");
        });
        let log = order.clone();
        let _a = subscribe(&registry, "evt", move |_| {
            log.lock().unwrap().push("a");
        });
        let log = order.clone();
        let _b = subscribe(&registry, "evt", move |_| {
            log.lock().unwrap().push("b");
        });

        dispatch(&registry, &msg("evt"));

        // Exact subscribers first in registration order, wildcard last even
        // though it registered first
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "star"]);
    }

    #[test]
    fn test_pong_reaches_no_handler() {
        let registry = new_registry();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let _star = subscribe(&registry, kinds::WILDCARD, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = hits.clone();
        let _pong = subscribe(&registry, kinds::PONG, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let delivered = dispatch(&registry, &msg(kinds::PONG));

        assert_eq!(delivered, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handler() {
        let registry = new_registry();
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));

        let counter = first_hits.clone();
        let first = subscribe(&registry, "evt", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second_hits.clone();
        let _second = subscribe(&registry, "evt", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dispatch(&registry, &msg("evt"));
        first.unsubscribe();
        dispatch(&registry, &msg("evt"));

        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_slot_is_pruned() {
        let registry = new_registry();

        let sub = subscribe(&registry, "evt", |_| {});
        assert_eq!(registry.read().slot_count(), 1);

        sub.unsubscribe();
        assert_eq!(registry.read().slot_count(), 0);
        assert_eq!(registry.read().handler_count("evt"), 0);
    }

    #[test]
    fn test_same_closure_under_multiple_kinds() {
        let registry = new_registry();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let on_any = move |_: &Message| {
            counter.fetch_add(1, Ordering::SeqCst);
        };
        let sub_a = subscribe(&registry, "a", on_any.clone());
        let _sub_b = subscribe(&registry, "b", on_any);

        dispatch(&registry, &msg("a"));
        dispatch(&registry, &msg("b"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // Removing the "a" registration leaves "b" untouched
        sub_a.unsubscribe();
        dispatch(&registry, &msg("a"));
        dispatch(&registry, &msg("b"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_later_handlers() {
        let registry = new_registry();
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = subscribe(&registry, "evt", |_| {
            panic!("subscriber bug");
        });
        let counter = hits.clone();
        let _good = subscribe(&registry, "evt", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let delivered = dispatch(&registry, &msg("evt"));

        assert_eq!(delivered, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_invoked_with_exact_payload() {
        let registry = new_registry();
        let seen = Arc::new(Mutex::new(None));

        let capture = seen.clone();
        let _sub = subscribe(&registry, "document.processing.completed", move |m| {
            *capture.lock().unwrap() = Some(m.clone());
        });

        let payload = serde_json::json!({ "document_id": "d1", "strategies_count": 3 });
        dispatch(
            &registry,
            &Message::new("document.processing.completed", payload.clone()),
        );

        let received = seen.lock().unwrap().take().unwrap();
        assert_eq!(received.kind, "document.processing.completed");
        assert_eq!(received.data, payload);
    }

    #[test]
    fn test_unsubscribe_after_teardown_is_noop() {
        let registry = new_registry();
        let sub = subscribe(&registry, "evt", |_| {});
        drop(registry);
        sub.unsubscribe();
    }
}
