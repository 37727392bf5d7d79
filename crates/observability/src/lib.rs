//! Tracing setup shared by every binary and test harness that drives the
//! engine. Both entry points are idempotent.

pub mod tracing;

pub use self::tracing::{init, init_for_tests};
