//! Task spawning.
//!
//! ```rust
//! use core_async::task;
//!
//! # core_async::runtime::block_on(async {
//! let handle = task::spawn(async { "done" });
//! assert_eq!(handle.await.unwrap(), "done");
//! # });
//! ```

pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawns a future onto the current runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

pub type Result<T> = std::result::Result<T, JoinError>;
