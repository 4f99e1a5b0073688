// ============================================================================
// spark-store - Reactivity Module
// Comparators that decide whether a consumer re-runs
// ============================================================================

pub mod equality;

pub use equality::{is, shallow_equal, shallow_equal_records, Field, Identity, Record, ShallowEq};
