//! # Media Library Model
//!
//! Domain types for the in-memory media library.
//!
//! ## Overview
//!
//! This crate holds:
//! - `MediaItem` and its typed identifiers (`MediaId`, `OwnerId`)
//! - `AspectRatio`, a tagged variant resolved through a static key table
//! - `MediaCollection`, the ordered, id-indexed, de-duplicated item sequence
//! - `LibraryState`, the collection plus the flags the UI renders from, and
//!   its immutable snapshot `LibraryView`
//!
//! Nothing here performs I/O. Mutation policy (who may write and when) lives
//! in `core-sync`.

pub mod collection;
pub mod error;
pub mod models;
pub mod state;

pub use bridge_traits::{MediaRecord, PageCursor, PageToken};
pub use collection::{AppendOutcome, MediaCollection};
pub use error::{LibraryError, Result};
pub use models::{AspectRatio, MediaId, MediaItem, OwnerId};
pub use state::{ErrorCode, LibraryErrorInfo, LibraryState, LibraryView};
