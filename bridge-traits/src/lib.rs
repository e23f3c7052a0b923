//! # Host Bridge Traits
//!
//! Contracts between the media library core and the collaborators it talks to.
//!
//! ## Overview
//!
//! The core never speaks a wire protocol itself. Each trait below is the
//! narrow interface a host platform (or a test) must provide:
//!
//! ### Remote storage
//! - [`RecordStore`](record_store::RecordStore) - paginated queries, delete-by-id
//!   and the full-snapshot push channel for media metadata records
//! - [`BlobStore`](blob_store::BlobStore) - delete-by-reference for binary artifacts
//!
//! ### Boundary services
//! - [`MediaProcessor`](media::MediaProcessor) - export and metadata probing
//! - [`EntitlementProvider`](entitlement::EntitlementProvider) - read-only premium status
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - time source for deterministic testing
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Every trait reports failures as [`BridgeError`](error::BridgeError).
//! Implementations should map "object does not exist" to
//! `BridgeError::NotFound` and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; the engine shares them across tasks
//! behind `Arc`.

pub mod blob_store;
pub mod entitlement;
pub mod error;
pub mod logging;
pub mod media;
pub mod record_store;
pub mod time;

pub use error::BridgeError;

pub use blob_store::BlobStore;
pub use entitlement::{EntitlementProvider, EntitlementStatus, FixedEntitlement};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{ExportParams, MediaMetadata, MediaProcessor};
pub use record_store::{
    MediaRecord, PageCursor, PageToken, RecordPage, RecordStore, SnapshotStream,
};
pub use time::{Clock, FixedClock, SystemClock};
