//! Binary artifact storage.

use async_trait::async_trait;

use crate::error::Result;

/// Remote store for binary artifacts (primary media files and thumbnails).
///
/// Implementations should report a missing object as
/// [`BridgeError::NotFound`](crate::error::BridgeError::NotFound) so callers
/// can tell "already gone" apart from a real failure.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Delete the artifact identified by `reference` (URI or URL).
    async fn delete_blob(&self, reference: &str) -> Result<()>;
}
