// ============================================================================
// spark-store - Action Bus
// Gated action listeners, with and without a host
// ============================================================================

use std::rc::Rc;

use tracing::trace;

use crate::core::registry::Subscription;
use crate::core::types::StoreState;
use crate::host::{Deps, Hooks};
use crate::primitives::store::Store;

impl<T: StoreState, A: 'static> Store<T, A> {
    /// Call `callback` for every dispatched action `matcher` accepts.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_store::{create_store, Store};
    /// use std::cell::Cell;
    /// use std::collections::HashMap;
    /// use std::rc::Rc;
    ///
    /// #[derive(Debug)]
    /// enum Action {
    ///     Reset,
    ///     Log(String),
    /// }
    ///
    /// let store: Store<HashMap<String, i32>, Action> = create_store(HashMap::new());
    /// let resets = Rc::new(Cell::new(0));
    ///
    /// let subscription = store.subscribe_action(
    ///     |action| matches!(action, Action::Reset),
    ///     {
    ///         let resets = resets.clone();
    ///         move |_| resets.set(resets.get() + 1)
    ///     },
    /// );
    ///
    /// store.dispatch(Action::Log("ignored".into()));
    /// store.dispatch(Action::Reset);
    /// assert_eq!(resets.get(), 1);
    ///
    /// subscription.unsubscribe();
    /// store.dispatch(Action::Reset);
    /// assert_eq!(resets.get(), 1);
    /// ```
    pub fn subscribe_action(
        &self,
        matcher: impl Fn(&A) -> bool + 'static,
        callback: impl Fn(&A) + 'static,
    ) -> Subscription {
        self.subscribe_actions(Rc::new(move |action: &A| {
            if matcher(action) {
                callback(action);
            }
        }))
    }

    /// Run `callback` for matching actions while the consumer is mounted.
    ///
    /// Matcher and callback are identified by their `Rc`s; passing new ones
    /// replaces the subscription after the render.
    pub fn use_store_effect<H, M, C>(&self, hooks: &H, matcher: &Rc<M>, callback: &Rc<C>)
    where
        H: Hooks,
        M: Fn(&A) -> bool + ?Sized + 'static,
        C: Fn(&A) + ?Sized + 'static,
    {
        let deps = Deps::new().rc(matcher).rc(callback);
        let store = self.clone();
        let matcher = matcher.clone();
        let callback = callback.clone();

        hooks.use_effect(deps, move || {
            trace!(store = store.label(), "action effect attached");
            let subscription = store.subscribe_action(
                move |action: &A| matcher(action),
                move |action: &A| callback(action),
            );

            Some(Box::new(move || {
                subscription.unsubscribe();
            }))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Component;
    use crate::primitives::store::create_store;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Increment(i32),
        Reset,
    }

    type State = BTreeMap<&'static str, i32>;
    type Matcher = Rc<dyn Fn(&Action) -> bool>;
    type Callback = Rc<dyn Fn(&Action)>;

    fn store() -> Store<State, Action> {
        create_store(BTreeMap::from([("count", 0)]))
    }

    fn is_reset() -> Matcher {
        Rc::new(|action: &Action| matches!(action, Action::Reset))
    }

    fn recorder(seen: &Rc<RefCell<Vec<Action>>>) -> Callback {
        let seen = seen.clone();
        Rc::new(move |action: &Action| seen.borrow_mut().push(action.clone()))
    }

    #[test]
    fn test_matcher_gates_callback() {
        let store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let callback = recorder(&seen);
        let matcher = is_reset();

        let _subscription = store.subscribe_action(
            move |action: &Action| matcher(action),
            move |action: &Action| callback(action),
        );

        store.dispatch(Action::Increment(1));
        store.dispatch(Action::Reset);
        assert_eq!(*seen.borrow(), vec![Action::Reset]);
        assert_eq!(store.read()["count"], 0);
    }

    #[test]
    fn test_every_listener_sees_dispatch() {
        let store = store();
        let matched = Rc::new(Cell::new(0));
        let checked = Rc::new(Cell::new(0));

        let _subscriptions: Vec<_> = (0..3)
            .map(|_| {
                let checked = checked.clone();
                let matched = matched.clone();
                store.subscribe_action(
                    move |action: &Action| {
                        checked.set(checked.get() + 1);
                        matches!(action, Action::Increment(_))
                    },
                    move |_| matched.set(matched.get() + 1),
                )
            })
            .collect();

        store.dispatch(Action::Reset);
        assert_eq!((checked.get(), matched.get()), (3, 0));

        store.dispatch(Action::Increment(2));
        assert_eq!((checked.get(), matched.get()), (6, 3));
    }

    #[test]
    fn test_effect_subscribes_while_mounted() {
        let store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let matcher = is_reset();
        let callback = recorder(&seen);

        let view = Component::mount({
            let store = store.clone();
            move |scope| store.use_store_effect(scope, &matcher, &callback)
        })
        .unwrap();
        assert_eq!(store.action_subscriber_count(), 1);

        store.dispatch(Action::Reset);
        // Stable Rcs keep the same subscription across renders
        view.rerender().unwrap();
        assert_eq!(store.action_subscriber_count(), 1);
        store.dispatch(Action::Reset);

        view.unmount();
        assert_eq!(store.action_subscriber_count(), 0);
        store.dispatch(Action::Reset);

        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(view.render_count(), 2);
    }

    #[test]
    fn test_callback_can_write() {
        let store = store();
        let matcher: Matcher = Rc::new(|action: &Action| matches!(action, Action::Increment(_)));
        let callback: Callback = Rc::new({
            let store = store.clone();
            move |action: &Action| {
                if let Action::Increment(by) = action {
                    let by = *by;
                    store.write(move |state| BTreeMap::from([("count", state["count"] + by)]));
                }
            }
        });

        let _view = Component::mount({
            let store = store.clone();
            move |scope| store.use_store_effect(scope, &matcher, &callback)
        })
        .unwrap();

        store.dispatch(Action::Increment(5));
        store.dispatch(Action::Reset);
        assert_eq!(store.read()["count"], 5);
    }

    #[test]
    fn test_new_callback_replaces_subscription() {
        let store = store();
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        let callbacks = [recorder(&first), recorder(&second)];
        let which = Rc::new(Cell::new(0));
        let matcher = is_reset();

        let view = Component::mount({
            let store = store.clone();
            let which = which.clone();
            move |scope| store.use_store_effect(scope, &matcher, &callbacks[which.get()])
        })
        .unwrap();

        which.set(1);
        view.rerender().unwrap();
        store.dispatch(Action::Reset);

        assert!(first.borrow().is_empty());
        assert_eq!(second.borrow().len(), 1);
        assert_eq!(store.action_subscriber_count(), 1);
    }
}
