// ============================================================================
// spark-store - Selector Binding
//
// Binds a consumer to a projection of the store. The consumer re-runs only
// when the projection changes under shallow comparison, not on every write.
// ============================================================================
//
// Per consumer:
// - one remembered cell, initialized to `selector(&store.read())`
// - one effect, keyed on the selector's identity and the cell's revision,
//   whose setup subscribes to the store and whose cleanup unsubscribes
//
// The subscriber compares each new projection against the value captured when
// it was registered. A change is stored in the cell, which makes the host
// re-run the consumer; that run sees a new revision, so the effect
// re-registers with the fresh value captured. Once its cleanup has run, an
// old subscriber ignores the rest of any pass it was snapshotted into.
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::core::types::StoreState;
use crate::host::{Deps, Hooks, ValueCell};
use crate::primitives::store::Store;
use crate::reactivity::equality::ShallowEq;

impl<T: StoreState, A: 'static> Store<T, A> {
    /// Current projection of the state, re-running the consumer when it
    /// changes.
    ///
    /// The selector is identified by its `Rc`: passing the same `Rc` on every
    /// render keeps one subscription, a different `Rc` re-subscribes.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_store::host::Component;
    /// use spark_store::{create_store, record, Store};
    /// use std::rc::Rc;
    ///
    /// record! {
    ///     #[derive(Debug, Clone)]
    ///     pub struct Counter => CounterPatch {
    ///         pub count: i32,
    ///         pub other: i32,
    ///     }
    /// }
    ///
    /// let store: Store<Counter> = create_store(Counter { count: 0, other: 0 });
    /// let count: Rc<dyn Fn(&Counter) -> i32> = Rc::new(|s: &Counter| s.count);
    ///
    /// let view = Component::mount({
    ///     let store = store.clone();
    ///     move |scope| store.use_selector(scope, &count)
    /// })
    /// .unwrap();
    ///
    /// store.write(|s| CounterPatch::default().other(s.other + 1));
    /// assert_eq!(view.render_count(), 1);
    ///
    /// store.write(|s| CounterPatch::default().count(s.count + 1));
    /// assert_eq!(view.render_count(), 2);
    /// assert_eq!(view.output(), Some(1));
    /// ```
    pub fn use_selector<H, F, S>(&self, hooks: &H, selector: &Rc<F>) -> S
    where
        H: Hooks,
        F: Fn(&T) -> S + ?Sized + 'static,
        S: ShallowEq + Clone + 'static,
    {
        self.use_selector_with(hooks, selector, S::shallow_eq)
    }

    /// [`use_selector`](Self::use_selector) with a custom comparison.
    ///
    /// `eq` returns `true` when two projections should be treated as equal.
    pub fn use_selector_with<H, F, S>(&self, hooks: &H, selector: &Rc<F>, eq: fn(&S, &S) -> bool) -> S
    where
        H: Hooks,
        F: Fn(&T) -> S + ?Sized + 'static,
        S: Clone + 'static,
    {
        let cell = hooks.use_state(|| selector(&self.read()));
        let current = cell.get();
        let deps = Deps::new().rc(selector).revision(cell.revision());

        let store = self.clone();
        let selector = selector.clone();
        let captured = current.clone();
        hooks.use_effect(deps, move || {
            let label: Rc<str> = Rc::from(store.label());
            let active = Rc::new(Cell::new(true));
            let subscription = store.subscribe(Rc::new({
                let active = active.clone();
                move |state: &T| {
                    if !active.get() {
                        return;
                    }
                    let next = selector(state);
                    if eq(&captured, &next) {
                        debug!(store = %label, "selection unchanged; skipping re-render");
                    } else {
                        debug!(store = %label, "selection changed; re-rendering");
                        cell.set(next);
                    }
                }
            }));

            Some(Box::new(move || {
                active.set(false);
                subscription.unsubscribe();
            }))
        });

        current
    }
}
