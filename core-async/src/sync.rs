//! Synchronization primitives.
//!
//! Async-aware locks and channels backed by `tokio::sync`, plus the
//! cancellation token used to tear down long-lived tasks.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, Mutex};
//!
//! # core_async::runtime::block_on(async {
//! let mutex = Mutex::new(42);
//! *mutex.lock().await += 1;
//!
//! let (tx, rx) = watch::channel(0u32);
//! tx.send_replace(7);
//! assert_eq!(*rx.borrow(), 7);
//! # });
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
