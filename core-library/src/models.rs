//! Domain models for the media library
//!
//! A `MediaItem` is the validated, in-memory form of a remote `MediaRecord`.

use bridge_traits::MediaRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LibraryError, Result};

// =============================================================================
// ID Types
// =============================================================================

/// Server-assigned identifier of a media item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the authenticated user owning a set of items
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Aspect Ratio
// =============================================================================

/// Frame shape of a media item.
///
/// Known shapes are resolved from the stored key through [`ASPECT_RATIOS`].
/// Anything else is kept as `Custom` with the stored dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Portrait9x16,
    Landscape16x9,
    Square1x1,
    Portrait4x5,
    Landscape4x3,
    Portrait3x4,
    Cinema21x9,
    Custom { width: u32, height: u32 },
}

/// One row of the aspect ratio lookup table.
#[derive(Debug, Clone, Copy)]
pub struct AspectRatioEntry {
    pub ratio: AspectRatio,
    pub key: &'static str,
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Static key/label table for the known shapes.
pub static ASPECT_RATIOS: [AspectRatioEntry; 7] = [
    AspectRatioEntry {
        ratio: AspectRatio::Portrait9x16,
        key: "9:16",
        label: "Story",
        width: 9,
        height: 16,
    },
    AspectRatioEntry {
        ratio: AspectRatio::Landscape16x9,
        key: "16:9",
        label: "Widescreen",
        width: 16,
        height: 9,
    },
    AspectRatioEntry {
        ratio: AspectRatio::Square1x1,
        key: "1:1",
        label: "Square",
        width: 1,
        height: 1,
    },
    AspectRatioEntry {
        ratio: AspectRatio::Portrait4x5,
        key: "4:5",
        label: "Portrait",
        width: 4,
        height: 5,
    },
    AspectRatioEntry {
        ratio: AspectRatio::Landscape4x3,
        key: "4:3",
        label: "Classic",
        width: 4,
        height: 3,
    },
    AspectRatioEntry {
        ratio: AspectRatio::Portrait3x4,
        key: "3:4",
        label: "Classic Portrait",
        width: 3,
        height: 4,
    },
    AspectRatioEntry {
        ratio: AspectRatio::Cinema21x9,
        key: "21:9",
        label: "Cinema",
        width: 21,
        height: 9,
    },
];

impl AspectRatio {
    /// Resolve a stored key. Unknown or missing keys become `Custom`.
    pub fn from_key(key: Option<&str>, width: u32, height: u32) -> Self {
        key.and_then(|key| ASPECT_RATIOS.iter().find(|entry| entry.key == key))
            .map(|entry| entry.ratio)
            .unwrap_or(AspectRatio::Custom { width, height })
    }

    fn entry(&self) -> Option<&'static AspectRatioEntry> {
        ASPECT_RATIOS.iter().find(|entry| entry.ratio == *self)
    }

    /// Stored key, `None` for custom shapes.
    pub fn key(&self) -> Option<&'static str> {
        self.entry().map(|entry| entry.key)
    }

    pub fn label(&self) -> &'static str {
        self.entry().map_or("Custom", |entry| entry.label)
    }

    /// Width and height of the shape in ratio units.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Custom { width, height } => (*width, *height),
            _ => self
                .entry()
                .map_or((0, 0), |entry| (entry.width, entry.height)),
        }
    }
}

// =============================================================================
// Media Item
// =============================================================================

/// A media item in the owner's library.
///
/// `id` and `created_at` are immutable once assigned; everything else is
/// replaced by [`MediaItem::apply_update`] when a newer copy arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub owner_id: OwnerId,
    pub title: String,
    /// Reference of the primary artifact
    pub media_ref: String,
    /// Reference of the thumbnail artifact
    pub thumbnail_ref: String,
    pub duration_ms: i64,
    pub size_bytes: i64,
    pub aspect_ratio: AspectRatio,
    /// Stored frame width, as recorded by the uploader
    pub aspect_ratio_width: u32,
    /// Stored frame height, as recorded by the uploader
    pub aspect_ratio_height: u32,
    /// Server timestamp, `None` until the server acknowledges the write
    pub created_at: Option<DateTime<Utc>>,
}

impl MediaItem {
    /// Validate item data
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(LibraryError::invalid("id", "Media id cannot be empty"));
        }

        if self.owner_id.as_str().trim().is_empty() {
            return Err(LibraryError::invalid("owner_id", "Owner id cannot be empty"));
        }

        if self.media_ref.trim().is_empty() {
            return Err(LibraryError::invalid(
                "media_ref",
                format!("Item {} has no media reference", self.id),
            ));
        }

        if self.duration_ms < 0 {
            return Err(LibraryError::invalid(
                "duration_ms",
                format!("Duration {} cannot be negative", self.duration_ms),
            ));
        }

        if self.size_bytes < 0 {
            return Err(LibraryError::invalid(
                "size_bytes",
                format!("Size {} cannot be negative", self.size_bytes),
            ));
        }

        Ok(())
    }

    /// Replace the mutable fields with those of `incoming`.
    ///
    /// `id` is never touched and `created_at` is only filled when it was
    /// still unassigned. Returns whether anything changed.
    pub fn apply_update(&mut self, incoming: &MediaItem) -> bool {
        let mut changed = false;

        macro_rules! assign {
            ($field:ident) => {
                if self.$field != incoming.$field {
                    self.$field = incoming.$field.clone();
                    changed = true;
                }
            };
        }

        assign!(title);
        assign!(media_ref);
        assign!(thumbnail_ref);
        assign!(duration_ms);
        assign!(size_bytes);
        assign!(aspect_ratio);
        assign!(aspect_ratio_width);
        assign!(aspect_ratio_height);

        if self.created_at.is_none() && incoming.created_at.is_some() {
            self.created_at = incoming.created_at;
            changed = true;
        }

        changed
    }

    /// Whether the item has a thumbnail artifact to clean up.
    pub fn has_thumbnail(&self) -> bool {
        !self.thumbnail_ref.trim().is_empty()
    }
}

impl TryFrom<MediaRecord> for MediaItem {
    type Error = LibraryError;

    fn try_from(record: MediaRecord) -> Result<Self> {
        let aspect_ratio = AspectRatio::from_key(
            record.aspect_ratio_key.as_deref(),
            record.aspect_ratio_width,
            record.aspect_ratio_height,
        );

        let item = MediaItem {
            id: MediaId::from(record.id),
            owner_id: OwnerId::new(record.owner_id),
            title: record.title,
            media_ref: record.media_ref,
            thumbnail_ref: record.thumbnail_ref,
            duration_ms: record.duration_ms,
            size_bytes: record.size_bytes,
            aspect_ratio,
            aspect_ratio_width: record.aspect_ratio_width,
            aspect_ratio_height: record.aspect_ratio_height,
            created_at: record.created_at,
        };

        item.validate()?;
        Ok(item)
    }
}
