//! Library state rendered by the UI.
//!
//! `LibraryState` is the mutable, authoritative copy owned by the sync
//! engine. `LibraryView` is the immutable snapshot published to observers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::collection::MediaCollection;
use crate::models::{MediaId, MediaItem};

/// Categorical code attached to a surfaced error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Fetch,
    Deletion,
    Subscription,
    Session,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Fetch => "fetch",
            ErrorCode::Deletion => "deletion",
            ErrorCode::Subscription => "subscription",
            ErrorCode::Session => "session",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error slot content: one message plus an optional code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryErrorInfo {
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl LibraryErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    pub fn uncategorized(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }
}

/// Authoritative in-memory library for one session.
#[derive(Debug, Clone, Default)]
pub struct LibraryState {
    pub collection: MediaCollection,
    /// A page fetch is outstanding
    pub loading: bool,
    /// Known to hold no items. `false` until the first answer arrives.
    pub empty: bool,
    /// A deletion cascade is running
    pub deleting: bool,
    pub error: Option<LibraryErrorInfo>,
}

impl LibraryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute `empty` from the collection.
    pub fn refresh_empty(&mut self) {
        self.empty = self.collection.is_empty();
    }

    pub fn set_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.error = Some(LibraryErrorInfo::new(code, message));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Remove one item and refresh `empty`.
    pub fn remove_item(&mut self, id: &MediaId) -> Option<MediaItem> {
        let removed = self.collection.remove(id);
        if removed.is_some() {
            self.refresh_empty();
        }
        removed
    }

    /// Back to the state of a fresh session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn view(&self) -> LibraryView {
        LibraryView {
            items: self.collection.items().to_vec(),
            loading: self.loading,
            empty: self.empty,
            deleting: self.deleting,
            error: self.error.clone(),
        }
    }
}

/// Immutable snapshot of [`LibraryState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryView {
    pub items: Vec<MediaItem>,
    pub loading: bool,
    pub empty: bool,
    pub deleting: bool,
    pub error: Option<LibraryErrorInfo>,
}

impl LibraryView {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, OwnerId};

    fn item(id: &str) -> MediaItem {
        MediaItem {
            id: MediaId::from(id),
            owner_id: OwnerId::from("owner-1"),
            title: String::new(),
            media_ref: format!("media/{}", id),
            thumbnail_ref: String::new(),
            duration_ms: 0,
            size_bytes: 0,
            aspect_ratio: AspectRatio::default(),
            aspect_ratio_width: 9,
            aspect_ratio_height: 16,
            created_at: None,
        }
    }

    #[test]
    fn test_fresh_state_is_not_known_empty() {
        let state = LibraryState::new();
        assert!(!state.empty);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_remove_last_item_marks_empty() {
        let mut state = LibraryState::new();
        state.collection = MediaCollection::from_ordered(vec![item("a")]);

        assert!(state.remove_item(&MediaId::from("a")).is_some());
        assert!(state.empty);
        assert!(state.remove_item(&MediaId::from("a")).is_none());
    }

    #[test]
    fn test_view_reflects_state() {
        let mut state = LibraryState::new();
        state.collection = MediaCollection::from_ordered(vec![item("a"), item("b")]);
        state.deleting = true;
        state.set_error(ErrorCode::Deletion, "Failed to delete");

        let view = state.view();
        assert_eq!(view.len(), 2);
        assert!(view.deleting);
        assert!(view.contains(&MediaId::from("b")));
        assert_eq!(view.error.unwrap().code, Some(ErrorCode::Deletion));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = LibraryState::new();
        state.collection = MediaCollection::from_ordered(vec![item("a")]);
        state.empty = true;
        state.set_error(ErrorCode::Fetch, "offline");

        state.reset();
        assert!(state.collection.is_empty());
        assert!(!state.empty);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::Subscription).unwrap();
        assert_eq!(json, "\"subscription\"");
    }
}
