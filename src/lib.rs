// ============================================================================
// spark-store - A Minimal Observable Store for Rust
// ============================================================================
//
// One state value per store, read and written by copy, with state listeners,
// a transient action channel, and bindings that re-run a consumer only when
// its selected projection changes under shallow comparison.
// ============================================================================

#[macro_use]
pub mod macros;

pub mod core;
pub mod host;
pub mod primitives;
pub mod reactivity;

// Re-export the store surface at crate root
pub use crate::core::registry::Subscription;
pub use crate::core::types::{ActionFn, CleanupFn, StoreOptions, StoreState, SubscriberFn};
pub use primitives::store::{create_store, create_store_with_options, Store};

// Re-export comparators
pub use reactivity::equality::{
    is, shallow_equal, shallow_equal_records, Field, Identity, Record, ShallowEq,
};

// Re-export the host seam
pub use host::{Component, Dep, Deps, HostError, Hooks, Scope, StateCell, ValueCell};

// =============================================================================
// TESTS
// =============================================================================
