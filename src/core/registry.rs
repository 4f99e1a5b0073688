// ============================================================================
// spark-store - Listener Registry
// Insertion-ordered listener set keyed by pointer identity
// ============================================================================
//
// Both store channels (state changes and actions) keep their listeners in a
// `Registry`. Listeners are `Rc`s and are de-duplicated by address, so
// registering the same `Rc` twice is a no-op.
//
// Notification passes never iterate the live list. They take a snapshot
// (`Vec<Rc<F>>`) and release the borrow before calling anyone, so listeners
// may subscribe, unsubscribe, write, or dispatch while a pass is running.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

// =============================================================================
// REGISTRY
// =============================================================================

struct Entry<F: ?Sized> {
    id: u64,
    listener: Rc<F>,
}

/// Listener set for one notification channel.
pub(crate) struct Registry<F: ?Sized> {
    entries: RefCell<Vec<Entry<F>>>,
    next_id: Cell<u64>,
    /// Store label, for log events
    store: Rc<str>,
    /// "state" or "action"
    channel: &'static str,
}

impl<F: ?Sized + 'static> Registry<F> {
    pub(crate) fn new(store: Rc<str>, channel: &'static str) -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            store,
            channel,
        })
    }

    /// Register a listener.
    ///
    /// If the same `Rc` is already registered, nothing is added and the
    /// returned subscription refers to the existing entry.
    pub(crate) fn insert(self: &Rc<Self>, listener: Rc<F>) -> Subscription {
        let key = Rc::as_ptr(&listener) as *const ();
        let mut entries = self.entries.borrow_mut();

        let existing = entries
            .iter()
            .find(|entry| Rc::as_ptr(&entry.listener) as *const () == key)
            .map(|entry| entry.id);

        let id = match existing {
            Some(id) => {
                trace!(store = %self.store, channel = self.channel, id, "listener already registered");
                id
            }
            None => {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                entries.push(Entry { id, listener });
                trace!(
                    store = %self.store,
                    channel = self.channel,
                    id,
                    listeners = entries.len(),
                    "listener registered"
                );
                id
            }
        };
        drop(entries);

        let registry: Rc<dyn Detach> = self.clone();
        Subscription {
            registry: Rc::downgrade(&registry),
            id,
        }
    }

    /// Copy of the current listeners, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.listener.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

trait Detach {
    fn detach(&self, id: u64) -> bool;
    fn contains(&self, id: u64) -> bool;
}

impl<F: ?Sized> Detach for Registry<F> {
    fn detach(&self, id: u64) -> bool {
        // Drop the removed listener after the borrow is released; its captures
        // may run arbitrary drop code.
        let removed = {
            let mut entries = self.entries.borrow_mut();
            let index = entries.iter().position(|entry| entry.id == id);
            index.map(|index| entries.remove(index))
        };

        match removed {
            Some(_) => {
                trace!(store = %self.store, channel = self.channel, id, "listener removed");
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.borrow().iter().any(|entry| entry.id == id)
    }
}

/// Handle returned by every registration.
///
/// Dropping a `Subscription` does not unsubscribe; call [`unsubscribe`].
/// The handle does not keep the store alive.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    registry: Weak<dyn Detach>,
    id: u64,
}

impl Subscription {
    /// Remove the listener.
    ///
    /// Returns true if this call removed it. Calling again (or through a
    /// second handle for the same listener) is a no-op returning false.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.detach(self.id))
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Rc<Registry<dyn Fn(&i32)>> {
        Registry::new(Rc::from("test"), "state")
    }

    #[test]
    fn test_insert_dedupes_by_pointer() {
        let registry = registry();
        let listener: Rc<dyn Fn(&i32)> = Rc::new(|_| {});

        let first = registry.insert(listener.clone());
        let second = registry.insert(listener.clone());
        assert_eq!(registry.len(), 1);

        // Both handles refer to the same entry
        assert!(second.unsubscribe());
        assert!(!first.is_active());
        assert!(!first.unsubscribe());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_same_behavior_different_pointer_registers_twice() {
        let registry = registry();
        let _a = registry.insert(Rc::new(|_: &i32| {}));
        let _b = registry.insert(Rc::new(|_: &i32| {}));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unsubscribe_idempotent() {
        let registry = registry();
        let subscription = registry.insert(Rc::new(|_: &i32| {}));

        assert!(subscription.is_active());
        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_snapshot_keeps_registration_order() {
        let registry = registry();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let subscriptions: Vec<_> = (0..3)
            .map(|n| {
                let seen = seen.clone();
                registry.insert(Rc::new(move |_: &i32| seen.borrow_mut().push(n)))
            })
            .collect();

        for listener in registry.snapshot() {
            listener(&0);
        }
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(subscriptions.len(), 3);
    }

    #[test]
    fn test_snapshot_isolated_from_later_changes() {
        let registry = registry();
        let first = registry.insert(Rc::new(|_: &i32| {}));
        let snapshot = registry.snapshot();

        first.unsubscribe();
        let _second = registry.insert(Rc::new(|_: &i32| {}));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_subscription_outlives_registry() {
        let subscription = {
            let registry = registry();
            registry.insert(Rc::new(|_: &i32| {}))
        };
        assert!(!subscription.is_active());
        assert!(!subscription.unsubscribe());
    }

    #[test]
    fn test_removed_id_not_reused() {
        let registry = registry();
        let old = registry.insert(Rc::new(|_: &i32| {}));
        old.unsubscribe();

        let new = registry.insert(Rc::new(|_: &i32| {}));
        // A stale handle cannot remove the new entry
        assert!(!old.unsubscribe());
        assert!(new.is_active());
    }
}
