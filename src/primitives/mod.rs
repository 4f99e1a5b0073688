// ============================================================================
// spark-store - Primitives Module
// The store handle and its bindings: selector and action bus
// ============================================================================

pub mod action;
pub mod selector;
pub mod store;

// Re-export for convenience
pub use store::{create_store, create_store_with_options, Store};
