// ============================================================================
// spark-store - Type Definitions
// State contract, listener signatures, and store options
// ============================================================================

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

// =============================================================================
// LISTENER TYPES
// =============================================================================

/// State-change listener. Registered by pointer identity.
pub type SubscriberFn<T> = Rc<dyn Fn(&T)>;

/// Action listener. Registered by pointer identity.
pub type ActionFn<A> = Rc<dyn Fn(&A)>;

/// Cleanup function returned by effect setups, runs on teardown
pub type CleanupFn = Box<dyn FnOnce()>;

// =============================================================================
// STORE STATE
// =============================================================================

/// A value a store can hold.
///
/// `Clone` is the store's shallow copy: it must not share mutable containers
/// with the original, so nested objects either live behind `Rc` (shared,
/// compared by identity) or are owned and cloned.
///
/// `merge` applies a partial update in place. Entries present in the patch
/// overwrite; everything else is kept.
///
/// Records declared with [`record!`](crate::record) implement this trait with
/// a generated patch type. Maps merge another map of the same type.
pub trait StoreState: Clone + 'static {
    /// Partial update accepted by [`Store::write`](crate::Store::write).
    type Patch;

    /// Overwrite the entries present in `patch`.
    fn merge(&mut self, patch: Self::Patch);
}

impl<K, V, S> StoreState for HashMap<K, V, S>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
    S: BuildHasher + Clone + 'static,
{
    type Patch = HashMap<K, V, S>;

    fn merge(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }
}

impl<K, V> StoreState for BTreeMap<K, V>
where
    K: Ord + Clone + 'static,
    V: Clone + 'static,
{
    type Patch = BTreeMap<K, V>;

    fn merge(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }
}

// =============================================================================
// STORE OPTIONS
// =============================================================================

/// Options for [`create_store_with_options`](crate::create_store_with_options).
///
/// # Example
///
/// ```
/// use spark_store::StoreOptions;
///
/// let options = StoreOptions::default().label("todos");
/// assert_eq!(options.label.as_deref(), Some("todos"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Name recorded on every log event emitted by the store.
    pub label: Option<Cow<'static, str>>,
}

impl StoreOptions {
    /// Set the store label.
    #[must_use]
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_merge_overwrites_and_keeps() {
        let mut state = HashMap::from([("a", 1), ("b", 2)]);
        state.merge(HashMap::from([("b", 20), ("c", 30)]));

        assert_eq!(state.len(), 3);
        assert_eq!(state["a"], 1);
        assert_eq!(state["b"], 20);
        assert_eq!(state["c"], 30);
    }

    #[test]
    fn test_btree_merge_empty_patch() {
        let mut state = BTreeMap::from([("a", 1)]);
        state.merge(BTreeMap::new());
        assert_eq!(state, BTreeMap::from([("a", 1)]));
    }

    #[test]
    fn test_options_label() {
        assert!(StoreOptions::default().label.is_none());
        let options = StoreOptions::default().label(String::from("app"));
        assert_eq!(options.label.as_deref(), Some("app"));
    }
}
