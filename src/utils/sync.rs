//! Synchronization primitives shared by the type registry and the proxy factory.
//!
//! Everything here is re-exported so the rest of the crate never has to care
//! which lock implementation backs a given structure.
pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc, OnceLock,
};
