//! Concurrency-control primitives.

mod keyed_lock;

pub use keyed_lock::{KeyedLock, KeyedLockGuard};
