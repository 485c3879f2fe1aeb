//! Storage-backend-agnostic core of Burrow: the `StorageEngine` trait, an
//! in-memory implementation of it, and the supporting ordered-index and
//! waiter-registry data structures. The HTTP frontend depends on this crate
//! and a concrete engine crate (in-memory or relational), never on the
//! other's internals.

pub mod engine;
pub mod index;
pub mod memory;
pub mod waiter;

pub use engine::{EntityProjection, MessageProjection, ScanMode, StorageEngine};
pub use memory::InMemoryEngine;
pub use waiter::WaiterRegistry;

/// The current wall-clock time as seconds since the Unix epoch. The only
/// place in this crate that touches the system clock; every other function
/// takes `now` as a plain argument so engine logic stays pure and testable.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
