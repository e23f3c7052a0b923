//! Time-related operations.
//!
//! ```rust
//! use core_async::time::{sleep, Duration};
//!
//! # core_async::runtime::block_on(async {
//! sleep(Duration::from_millis(1)).await;
//! # });
//! ```

pub use tokio::time::{interval, sleep, Interval, MissedTickBehavior};

pub use std::time::{Duration, Instant};
