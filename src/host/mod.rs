// ============================================================================
// spark-store - Host Seam
// The two capabilities a rendering framework lends to store bindings
// ============================================================================
//
// Store bindings (`use_selector`, `use_store_effect`) only need:
// - a remembered-value cell that survives re-evaluation and asks the host to
//   re-run the consumer when it is set (`ValueCell`)
// - an effect registration that runs a setup when its dependencies change and
//   the setup's cleanup before the next run or on teardown (`Hooks`)
//
// Any framework can implement these. `Component` is a small reference
// runtime used by the tests and by consumers without a framework.
// ============================================================================

pub mod component;
pub mod error;

use std::rc::Rc;

use crate::core::types::CleanupFn;

pub use component::{Component, Scope, StateCell};
pub use error::HostError;

// =============================================================================
// VALUE CELL
// =============================================================================

/// A per-consumer slot that survives re-evaluation.
pub trait ValueCell<S>: Clone + 'static {
    /// Current value.
    fn get(&self) -> S;

    /// Store a new value and ask the host to re-run the owning consumer.
    fn set(&self, value: S);

    /// Number of `set` calls so far; used as an effect dependency.
    fn revision(&self) -> u64;
}

// =============================================================================
// HOOKS
// =============================================================================

/// The registration surface a host hands to a consumer while it renders.
pub trait Hooks {
    /// The cell type returned by [`use_state`](Self::use_state).
    type Cell<S: Clone + 'static>: ValueCell<S>;

    /// Remembered value for this call site. `init` runs on first use only.
    fn use_state<S: Clone + 'static>(&self, init: impl FnOnce() -> S) -> Self::Cell<S>;

    /// Effect with cleanup.
    ///
    /// `setup` runs after the render when `deps` differ from the previous
    /// render's (always on the first). The previous cleanup runs first. The
    /// last cleanup runs when the consumer is torn down.
    fn use_effect(&self, deps: Deps, setup: impl FnOnce() -> Option<CleanupFn> + 'static);
}

// =============================================================================
// DEPENDENCIES
// =============================================================================

/// One effect dependency, compared by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dep {
    /// Address of a shared allocation
    Ptr(usize),
    /// Revision counter of a [`ValueCell`]
    Revision(u64),
}

impl Dep {
    /// Dependency on the identity of `rc`.
    pub fn of_rc<T: ?Sized>(rc: &Rc<T>) -> Self {
        Dep::Ptr(Rc::as_ptr(rc) as *const () as usize)
    }
}

/// Dependency list for [`Hooks::use_effect`].
///
/// # Example
///
/// ```
/// use spark_store::host::Deps;
/// use std::rc::Rc;
///
/// let selector = Rc::new(|n: &i32| *n);
/// let a = Deps::new().rc(&selector).revision(0);
/// let b = Deps::new().rc(&selector.clone()).revision(0);
/// assert_eq!(a, b);
/// assert_ne!(a, Deps::new().rc(&selector).revision(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Deps(Vec<Dep>);

impl Deps {
    /// Empty list; an effect with no dependencies runs once.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependency.
    #[must_use]
    pub fn with(mut self, dep: Dep) -> Self {
        self.0.push(dep);
        self
    }

    /// Append the identity of `rc`.
    #[must_use]
    pub fn rc<T: ?Sized>(self, rc: &Rc<T>) -> Self {
        self.with(Dep::of_rc(rc))
    }

    /// Append a cell revision.
    #[must_use]
    pub fn revision(self, revision: u64) -> Self {
        self.with(Dep::Revision(revision))
    }

    /// Number of dependencies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for a list that never changes between renders.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dep_identity() {
        let a: Rc<dyn Fn()> = Rc::new(|| {});
        let b: Rc<dyn Fn()> = Rc::new(|| {});
        assert_eq!(Dep::of_rc(&a), Dep::of_rc(&a.clone()));
        assert_ne!(Dep::of_rc(&a), Dep::of_rc(&b));
    }

    #[test]
    fn test_deps_order_matters() {
        let first = Deps::new().revision(1).revision(2);
        let second = Deps::new().revision(2).revision(1);
        assert_ne!(first, second);
        assert_eq!(first.len(), 2);
        assert!(Deps::new().is_empty());
    }
}
