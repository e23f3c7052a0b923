//! Ordered, id-indexed collection of media items.
//!
//! Items keep the order in which they were placed (head = most recent). An
//! `id -> position` index gives O(1) membership and lookup; the index is
//! rebuilt whenever positions shift.

use std::collections::HashMap;

use crate::models::{MediaId, MediaItem};

/// Result of appending a batch of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    /// Items appended to the tail
    pub added: usize,
    /// Items dropped because their id was already present
    pub skipped: usize,
}

/// Ordered sequence of unique media items.
#[derive(Debug, Clone, Default)]
pub struct MediaCollection {
    items: Vec<MediaItem>,
    index: HashMap<MediaId, usize>,
}

impl MediaCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered list. Later duplicates of an id are dropped.
    pub fn from_ordered(items: Vec<MediaItem>) -> Self {
        let mut collection = Self {
            items: Vec::with_capacity(items.len()),
            index: HashMap::with_capacity(items.len()),
        };
        collection.append_unique(items);
        collection
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.index.contains_key(id)
    }

    pub fn position(&self, id: &MediaId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &MediaId) -> Option<&MediaItem> {
        self.position(id).map(|pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, id: &MediaId) -> Option<&mut MediaItem> {
        self.position(id).map(move |pos| &mut self.items[pos])
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MediaId> {
        self.items.iter().map(|item| &item.id)
    }

    /// Append items whose ids are not yet present, preserving their order.
    pub fn append_unique(&mut self, items: impl IntoIterator<Item = MediaItem>) -> AppendOutcome {
        let mut outcome = AppendOutcome::default();

        for item in items {
            if self.index.contains_key(&item.id) {
                outcome.skipped += 1;
                continue;
            }
            self.index.insert(item.id.clone(), self.items.len());
            self.items.push(item);
            outcome.added += 1;
        }

        outcome
    }

    /// Remove an item, shifting later items up by one.
    pub fn remove(&mut self, id: &MediaId) -> Option<MediaItem> {
        let pos = self.index.remove(id)?;
        let removed = self.items.remove(pos);

        for (offset, item) in self.items[pos..].iter().enumerate() {
            self.index.insert(item.id.clone(), pos + offset);
        }

        Some(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Consume the collection, returning its items in order.
    pub fn into_items(self) -> Vec<MediaItem> {
        self.items
    }
}

impl<'a> IntoIterator for &'a MediaCollection {
    type Item = &'a MediaItem;
    type IntoIter = std::slice::Iter<'a, MediaItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
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
            title: id.to_uppercase(),
            media_ref: format!("media/{}.mp4", id),
            thumbnail_ref: format!("thumbs/{}.jpg", id),
            duration_ms: 1_000,
            size_bytes: 10,
            aspect_ratio: AspectRatio::Square1x1,
            aspect_ratio_width: 1,
            aspect_ratio_height: 1,
            created_at: None,
        }
    }

    fn ids(collection: &MediaCollection) -> Vec<&str> {
        collection.ids().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_from_ordered_drops_duplicates() {
        let collection = MediaCollection::from_ordered(vec![item("a"), item("b"), item("a")]);
        assert_eq!(ids(&collection), vec!["a", "b"]);
        assert_eq!(collection.position(&MediaId::from("b")), Some(1));
    }

    #[test]
    fn test_append_unique_skips_known_ids() {
        let mut collection = MediaCollection::from_ordered(vec![item("a")]);
        let outcome = collection.append_unique(vec![item("b"), item("a"), item("c"), item("b")]);

        assert_eq!(outcome, AppendOutcome { added: 2, skipped: 2 });
        assert_eq!(ids(&collection), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_reindexes_tail() {
        let mut collection =
            MediaCollection::from_ordered(vec![item("a"), item("b"), item("c"), item("d")]);

        let removed = collection.remove(&MediaId::from("b")).unwrap();
        assert_eq!(removed.id.as_str(), "b");
        assert_eq!(ids(&collection), vec!["a", "c", "d"]);
        assert_eq!(collection.position(&MediaId::from("c")), Some(1));
        assert_eq!(collection.position(&MediaId::from("d")), Some(2));
        assert!(collection.remove(&MediaId::from("b")).is_none());
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut collection = MediaCollection::from_ordered(vec![item("a"), item("b")]);
        collection.get_mut(&MediaId::from("b")).unwrap().title = "Edited".to_string();

        assert_eq!(collection.get(&MediaId::from("b")).unwrap().title, "Edited");
        assert_eq!(collection.position(&MediaId::from("b")), Some(1));
    }

    #[test]
    fn test_clear() {
        let mut collection = MediaCollection::from_ordered(vec![item("a")]);
        collection.clear();
        assert!(collection.is_empty());
        assert!(!collection.contains(&MediaId::from("a")));
    }
}
