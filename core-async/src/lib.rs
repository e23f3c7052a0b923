//! Runtime abstraction layer for the media library core.
//!
//! Every `core-*` crate goes through this crate instead of depending on Tokio
//! directly, so the executor can be swapped in one place. The surface is kept
//! to what the engine actually needs:
//!
//! - `task`: spawning background work (subscription delivery, periodic sweeps)
//! - `sync`: async locks, `watch`/`broadcast` channels and `CancellationToken`
//! - `time`: `sleep` and `interval`
//! - `runtime`: `block_on` for synchronous entry points and tests
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! # core_async::runtime::block_on(async {
//! let handle = task::spawn(async { 42 });
//! assert_eq!(handle.await.unwrap(), 42);
//! # });
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration};

/// Waits on multiple branches, returning when the first completes.
pub use tokio::select;
