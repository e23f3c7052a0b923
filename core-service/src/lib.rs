//! Media library façade for the UI layer.
//!
//! [`MediaLibraryService`] wires the host-provided collaborators from a
//! [`CoreConfig`] into the sync engine and exposes the operations the UI
//! needs:
//!
//! - `attach` / `detach` / `bind_session` for the subscription lifecycle
//! - `load_next_page`, `delete_item`, `reset_session`
//! - `state()` (a `watch` receiver of `LibraryView`) and `events()`
//! - `reconcile()` for interrupted deletions
//! - `export_media` / `media_metadata`, passed through to the media processor
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::MediaLibraryService;
//!
//! let config = CoreConfig::builder()
//!     .record_store(records)
//!     .blob_store(blobs)
//!     .build()?;
//! let library = MediaLibraryService::bootstrap(config)?;
//! library.bind_session(auth_rx);
//! library.load_next_page().await?;
//! ```

pub mod error;
mod service;
mod session;

pub use error::{CoreError, Result};
pub use service::MediaLibraryService;

pub use core_library::{LibraryView, MediaId, MediaItem, OwnerId};
pub use core_runtime::config::CoreConfig;
pub use core_sync::{FetchOutcome, SweepReport};
