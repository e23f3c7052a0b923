//! Remote Record Store Abstraction
//!
//! The record store is the remote document collection that holds one metadata
//! record per media item. It offers three capabilities:
//!
//! - cursor-paginated queries filtered by owner
//! - delete-by-id
//! - a push channel that re-delivers the *entire* current matching set for an
//!   owner on every remote change (a snapshot, never a delta)
//!
//! No wire format is prescribed; hosts adapt their backend to these types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// A metadata record as stored remotely.
///
/// `created_at` is assigned by the server and may be absent on records that
/// were written locally and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub title: String,
    pub media_ref: String,
    #[serde(default)]
    pub thumbnail_ref: String,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub aspect_ratio_key: Option<String>,
    #[serde(default)]
    pub aspect_ratio_width: u32,
    #[serde(default)]
    pub aspect_ratio_height: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Opaque boundary token returned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageToken(pub String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position from which the next page is requested.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageCursor {
    /// Beginning of the collection (most recent first).
    #[default]
    Start,
    /// Resume strictly after the given boundary.
    After(PageToken),
}

impl PageCursor {
    pub fn is_start(&self) -> bool {
        matches!(self, PageCursor::Start)
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordPage {
    /// Records ordered by `created_at`, newest first.
    pub records: Vec<MediaRecord>,
    /// Boundary of the last record in this page, `None` when the page is empty.
    pub boundary: Option<PageToken>,
}

impl RecordPage {
    pub fn new(records: Vec<MediaRecord>, boundary: Option<PageToken>) -> Self {
        Self { records, boundary }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Stream of full snapshots for one owner.
///
/// Each item is the complete set of records currently matching the owner
/// filter. An `Err` item reports a push-channel failure; the stream may keep
/// producing snapshots afterwards. The stream ends when the remote side
/// closes the channel.
pub type SnapshotStream = BoxStream<'static, Result<Vec<MediaRecord>>>;

/// Remote document collection holding media metadata records.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::record_store::{PageCursor, RecordStore};
///
/// async fn first_page(store: &dyn RecordStore) -> bridge_traits::error::Result<usize> {
///     let page = store.query_page("owner-1", &PageCursor::Start, 20).await?;
///     Ok(page.records.len())
/// }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Query up to `limit` records for `owner_id`, strictly after `cursor`.
    async fn query_page(
        &self,
        owner_id: &str,
        cursor: &PageCursor,
        limit: u32,
    ) -> Result<RecordPage>;

    /// Delete the record with the given id.
    async fn delete_record(&self, id: &str) -> Result<()>;

    /// Open the push channel for `owner_id`.
    ///
    /// Dropping the returned stream must release the remote listener.
    async fn subscribe(&self, owner_id: &str) -> Result<SnapshotStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_from_camel_case_document() {
        let json = r#"{
            "id": "rec-1",
            "ownerId": "owner-1",
            "title": "Beach",
            "mediaRef": "https://blobs.example/media/rec-1.mp4",
            "thumbnailRef": "https://blobs.example/thumbs/rec-1.jpg",
            "durationMs": 12000,
            "sizeBytes": 4096,
            "aspectRatioKey": "9:16",
            "aspectRatioWidth": 9,
            "aspectRatioHeight": 16,
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;

        let record: MediaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "rec-1");
        assert_eq!(record.owner_id, "owner-1");
        assert_eq!(record.aspect_ratio_key.as_deref(), Some("9:16"));
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_pending_record_has_no_timestamp() {
        let json = r#"{"id": "rec-2", "ownerId": "owner-1", "mediaRef": "m"}"#;
        let record: MediaRecord = serde_json::from_str(json).unwrap();
        assert!(record.created_at.is_none());
        assert!(record.thumbnail_ref.is_empty());
    }

    #[test]
    fn test_cursor_defaults_to_start() {
        assert!(PageCursor::default().is_start());
        assert!(!PageCursor::After(PageToken::new("b")).is_start());
    }
}
