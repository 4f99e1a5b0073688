// ============================================================================
// spark-store - Core Module
// State contract, listener registry, and shared types
// ============================================================================

pub mod registry;
pub mod types;

// Re-export commonly used items
pub use registry::Subscription;
pub use types::{ActionFn, CleanupFn, StoreOptions, StoreState, SubscriberFn};
