// ============================================================================
// spark-store - Store
// A single state snapshot with copy-on-read / copy-on-write semantics and
// two independent listener channels
// ============================================================================
//
// The store owns one value and never lends it out:
// - `read()` returns a clone
// - `write()` hands the updater a clone, merges its patch into another clone,
//   swaps that in, then notifies state listeners
// - `dispatch()` broadcasts a transient action to action listeners; state is
//   not touched
//
// Everything is synchronous. A notification pass calls the listeners that were
// registered when the pass started, in registration order, each with the
// state current at the moment it is called. After a listener writes, the rest
// of the outer pass sees the nested write's result. A panicking
// updater or listener unwinds through `write`/`dispatch` and later listeners
// in that pass are not called.
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::core::registry::{Registry, Subscription};
use crate::core::types::{ActionFn, StoreOptions, StoreState, SubscriberFn};

const DEFAULT_LABEL: &str = "store";

// =============================================================================
// STORE INNER
// =============================================================================

struct StoreInner<T, A> {
    /// Replaced wholesale on every write, never mutated in place
    state: RefCell<Rc<T>>,
    subscribers: Rc<Registry<dyn Fn(&T)>>,
    actions: Rc<Registry<dyn Fn(&A)>>,
    label: Rc<str>,
}

// =============================================================================
// STORE<T, A> - The public store handle
// =============================================================================

/// An observable state container.
///
/// `T` is the state record, `A` the action payload type (an application
/// enum, or `()` when actions are unused). Cloning a `Store` clones the
/// handle; both clones drive the same store.
///
/// # Example
///
/// ```
/// use spark_store::{create_store, Store};
/// use std::collections::HashMap;
///
/// let store: Store<HashMap<&str, i32>> = create_store(HashMap::from([("count", 0)]));
///
/// store.write(|state| HashMap::from([("count", state["count"] + 1)]));
/// assert_eq!(store.read()["count"], 1);
/// ```
pub struct Store<T, A = ()> {
    inner: Rc<StoreInner<T, A>>,
}

impl<T, A> Clone for Store<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: StoreState, A: 'static> Store<T, A> {
    /// Create a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Self::with_options(initial, StoreOptions::default())
    }

    /// Create a store with explicit options.
    pub fn with_options(initial: T, options: StoreOptions) -> Self {
        let label: Rc<str> = Rc::from(options.label.as_deref().unwrap_or(DEFAULT_LABEL));

        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(initial)),
                subscribers: Registry::new(label.clone(), "state"),
                actions: Registry::new(label.clone(), "action"),
                label,
            }),
        }
    }

    /// The label given in [`StoreOptions`], or `"store"`.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Current state, as a fresh copy.
    ///
    /// Mutating the returned value never affects the store.
    pub fn read(&self) -> T {
        T::clone(&self.inner.state.borrow())
    }

    /// Apply a partial update and notify state listeners.
    ///
    /// `updater` receives its own copy of the current state; changes it makes
    /// to that copy are discarded. The returned patch is merged over a fresh
    /// copy, which replaces the stored state before any listener runs.
    ///
    /// Listeners may write again; nested writes apply to the already-updated
    /// state, and every listener receives the state current when it is
    /// called. Nothing guards against listeners that keep writing forever.
    pub fn write(&self, updater: impl FnOnce(T) -> T::Patch) {
        let patch = updater(self.read());
        self.commit(patch);
    }

    /// Like [`write`](Self::write) with a fallible updater.
    ///
    /// On `Err` the state is unchanged, no listener is notified, and the
    /// error is returned as is.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_store::{create_store, Store};
    /// use std::collections::BTreeMap;
    ///
    /// let store: Store<BTreeMap<&str, u32>> = create_store(BTreeMap::from([("stock", 1)]));
    ///
    /// let take = |state: BTreeMap<&'static str, u32>| match state["stock"].checked_sub(1) {
    ///     Some(left) => Ok(BTreeMap::from([("stock", left)])),
    ///     None => Err("out of stock"),
    /// };
    ///
    /// assert_eq!(store.try_write(take), Ok(()));
    /// assert_eq!(store.try_write(take), Err("out of stock"));
    /// assert_eq!(store.read()["stock"], 0);
    /// ```
    pub fn try_write<E>(&self, updater: impl FnOnce(T) -> Result<T::Patch, E>) -> Result<(), E> {
        let patch = updater(self.read())?;
        self.commit(patch);
        Ok(())
    }

    fn commit(&self, patch: T::Patch) {
        let mut next = self.read();
        next.merge(patch);
        let previous = self.inner.state.replace(Rc::new(next));
        drop(previous);

        let subscribers = self.inner.subscribers.snapshot();
        trace!(store = %self.inner.label, subscribers = subscribers.len(), "state written");
        for subscriber in subscribers {
            let current = self.inner.state.borrow().clone();
            subscriber(&current);
        }
    }

    /// Register a state listener.
    ///
    /// Listeners are keyed by `Rc` address: subscribing the same `Rc` again
    /// does nothing. A listener added during a notification pass is first
    /// called on the next write.
    pub fn subscribe(&self, subscriber: SubscriberFn<T>) -> Subscription {
        self.inner.subscribers.insert(subscriber)
    }

    /// Broadcast an action to every action listener.
    ///
    /// The action is not stored. Matching happens inside each listener, so
    /// every registered listener is invoked.
    pub fn dispatch(&self, action: A) {
        let listeners = self.inner.actions.snapshot();
        trace!(store = %self.inner.label, listeners = listeners.len(), "action dispatched");
        for listener in listeners {
            listener(&action);
        }
    }

    /// Register an unfiltered action listener.
    pub fn subscribe_actions(&self, listener: ActionFn<A>) -> Subscription {
        self.inner.actions.insert(listener)
    }

    /// Number of registered state listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Number of registered action listeners.
    pub fn action_subscriber_count(&self) -> usize {
        self.inner.actions.len()
    }
}

impl<T: StoreState + fmt::Debug, A: 'static> fmt::Debug for Store<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.inner.label)
            .field("state", &**self.inner.state.borrow())
            .field("subscribers", &self.inner.subscribers.len())
            .field("actions", &self.inner.actions.len())
            .finish()
    }
}

// =============================================================================
// CREATE STORE
// =============================================================================

/// Create a store holding `initial`.
///
/// # Example
///
/// ```
/// use spark_store::{create_store, record, Store};
///
/// record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Counter => CounterPatch {
///         pub count: i32,
///     }
/// }
///
/// let store: Store<Counter> = create_store(Counter { count: 0 });
/// store.write(|s| CounterPatch::default().count(s.count + 1));
/// store.write(|s| CounterPatch::default().count(s.count + 1));
/// assert_eq!(store.read(), Counter { count: 2 });
/// ```
pub fn create_store<T: StoreState, A: 'static>(initial: T) -> Store<T, A> {
    Store::new(initial)
}

/// Create a store with explicit [`StoreOptions`].
pub fn create_store_with_options<T: StoreState, A: 'static>(
    initial: T,
    options: StoreOptions,
) -> Store<T, A> {
    Store::with_options(initial, options)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    type State = BTreeMap<&'static str, i32>;

    fn counter() -> Store<State, &'static str> {
        create_store(BTreeMap::from([("count", 0), ("other", 0)]))
    }

    fn bump(key: &'static str) -> impl FnOnce(State) -> State {
        move |state| BTreeMap::from([(key, state[key] + 1)])
    }

    #[test]
    fn test_read_returns_copy() {
        let store = counter();
        let mut snapshot = store.read();
        snapshot.insert("count", 99);
        snapshot.insert("extra", 1);

        assert_eq!(store.read(), BTreeMap::from([("count", 0), ("other", 0)]));
    }

    #[test]
    fn test_write_merges_patch() {
        let store = counter();
        store.write(bump("count"));
        store.write(bump("count"));

        let state = store.read();
        assert_eq!(state["count"], 2);
        assert_eq!(state["other"], 0);
    }

    #[test]
    fn test_updater_mutation_is_invisible() {
        let store = counter();
        store.write(|mut state| {
            state.insert("other", 100);
            BTreeMap::from([("count", 1)])
        });

        assert_eq!(store.read(), BTreeMap::from([("count", 1), ("other", 0)]));
    }

    #[test]
    fn test_subscribers_see_written_state() {
        let store = counter();
        let seen = Rc::new(Cell::new(-1));

        let _subscription = store.subscribe(Rc::new({
            let seen = seen.clone();
            let store = store.clone();
            move |state: &State| {
                // The stored value is already replaced
                assert_eq!(store.read()["count"], state["count"]);
                seen.set(state["count"]);
            }
        }));

        store.write(bump("count"));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = counter();
        let calls = Rc::new(Cell::new(0));

        let subscription = store.subscribe(Rc::new({
            let calls = calls.clone();
            move |_: &State| calls.set(calls.get() + 1)
        }));

        store.write(bump("count"));
        assert!(subscription.unsubscribe());
        store.write(bump("count"));

        assert_eq!(calls.get(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_double_subscribe_notifies_once() {
        let store = counter();
        let calls = Rc::new(Cell::new(0));
        let listener: Rc<dyn Fn(&State)> = Rc::new({
            let calls = calls.clone();
            move |_| calls.set(calls.get() + 1)
        });

        let _a = store.subscribe(listener.clone());
        let _b = store.subscribe(listener);
        store.write(bump("count"));

        assert_eq!(calls.get(), 1);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_reentrant_write_applies_to_updated_state() {
        let store = counter();

        let _subscription = store.subscribe(Rc::new({
            let store = store.clone();
            move |state: &State| {
                if state["count"] == 1 {
                    store.write(bump("count"));
                }
            }
        }));

        store.write(bump("count"));
        assert_eq!(store.read()["count"], 2);
    }

    #[test]
    fn test_listeners_after_nested_write_see_latest_state() {
        let store = counter();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _writer = store.subscribe(Rc::new({
            let store = store.clone();
            move |state: &State| {
                if state["count"] == 1 {
                    store.write(bump("count"));
                }
            }
        }));
        let _reader = store.subscribe(Rc::new({
            let seen = seen.clone();
            move |state: &State| seen.borrow_mut().push(state["count"])
        }));

        store.write(bump("count"));

        // Nested pass first, then the outer pass resumes with the same state
        assert_eq!(*seen.borrow(), vec![2, 2]);
    }

    #[test]
    fn test_try_write_error_leaves_state() {
        let store = counter();
        let calls = Rc::new(Cell::new(0));
        let _subscription = store.subscribe(Rc::new({
            let calls = calls.clone();
            move |_: &State| calls.set(calls.get() + 1)
        }));

        let result: Result<(), &str> = store.try_write(|_| Err("rejected"));
        assert_eq!(result, Err("rejected"));
        assert_eq!(store.read()["count"], 0);
        assert_eq!(calls.get(), 0);

        assert_eq!(store.try_write::<()>(|s| Ok(bump("count")(s))), Ok(()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_dispatch_leaves_state() {
        let store = counter();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _subscription = store.subscribe_actions(Rc::new({
            let seen = seen.clone();
            move |action: &&'static str| seen.borrow_mut().push(*action)
        }));

        store.dispatch("ping");
        store.dispatch("pong");

        assert_eq!(*seen.borrow(), vec!["ping", "pong"]);
        assert_eq!(store.read()["count"], 0);
    }

    #[test]
    fn test_channels_are_independent() {
        let store = counter();
        let state_calls = Rc::new(Cell::new(0));
        let action_calls = Rc::new(Cell::new(0));

        let _s = store.subscribe(Rc::new({
            let state_calls = state_calls.clone();
            move |_: &State| state_calls.set(state_calls.get() + 1)
        }));
        let _a = store.subscribe_actions(Rc::new({
            let action_calls = action_calls.clone();
            move |_: &&'static str| action_calls.set(action_calls.get() + 1)
        }));

        store.write(bump("count"));
        assert_eq!((state_calls.get(), action_calls.get()), (1, 0));

        store.dispatch("noop");
        assert_eq!((state_calls.get(), action_calls.get()), (1, 1));
    }

    #[test]
    fn test_label() {
        assert_eq!(counter().label(), "store");

        let store: Store<State> =
            create_store_with_options(BTreeMap::new(), StoreOptions::default().label("named"));
        assert_eq!(store.label(), "named");
    }

    #[test]
    fn test_debug_output() {
        let store = counter();
        let rendered = format!("{store:?}");
        assert!(rendered.contains("Store"));
        assert!(rendered.contains("count"));
    }
}
