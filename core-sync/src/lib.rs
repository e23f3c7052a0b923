//! # Media Library Sync Engine
//!
//! Keeps one ordered, de-duplicated collection of the owner's media items
//! consistent with the remote record store.
//!
//! ## Overview
//!
//! Two independent sources feed the collection:
//! - a cursor-paginated bulk query (`PaginatedFetcher`)
//! - a push channel re-delivering the complete matching set on every remote
//!   change (`ChangeSubscription`)
//!
//! Both write through the `LibraryStore`, which serializes every mutation
//! and publishes a `LibraryView` to the UI after each one.
//!
//! ## Components
//!
//! - **Library Store** (`store`): single mutation entry point, session epochs
//! - **Merge Reconciler** (`reconciler`): folds full snapshots into the collection
//! - **Paginated Fetcher** (`fetcher`): re-entrancy guarded page loading
//! - **Change Subscription** (`subscription`): owned push-channel subscription
//! - **Deletion Coordinator** (`deletion`): ordered blob/record deletion cascade
//! - **Cleanup Ledger** (`ledger`) and **Reconciliation Sweep** (`sweep`):
//!   finishing cascades that stopped part-way

pub mod deletion;
pub mod error;
pub mod fetcher;
mod gate;
pub mod ledger;
pub mod reconciler;
pub mod store;
pub mod subscription;
pub mod sweep;

pub use deletion::{DeletionCoordinator, DeletionStep};
pub use error::{Result, SyncError};
pub use fetcher::{FetchOutcome, PaginatedFetcher};
pub use ledger::{CleanupEntry, CleanupLedger};
pub use reconciler::{MergeOutcome, MergeReconciler};
pub use store::LibraryStore;
pub use subscription::ChangeSubscription;
pub use sweep::{ReconciliationSweep, SweepReport};
