//! # Merge Reconciler
//!
//! Folds a pushed snapshot into the current collection.
//!
//! A snapshot is the complete set of items currently matching the owner
//! filter, so the merge is a set replacement that keeps local ordering:
//!
//! 1. Items already present are updated in place (mutable fields only).
//! 2. Items not present are placed at the head as one block, in the order the
//!    snapshot lists them.
//! 3. Items absent from the snapshot are removed.
//!
//! New items are assumed to arrive newest-first; the collection is not
//! re-sorted by `created_at`. Runs in O(|L| + |S|) through the collection's id
//! index.

use std::collections::HashMap;

use core_library::{MediaCollection, MediaId, MediaItem};

/// Counts produced by one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub inserted: usize,
    /// Present before and after, with at least one field changed
    pub updated: usize,
    pub removed: usize,
}

impl MergeOutcome {
    /// Whether the merge left the collection untouched.
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.removed == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeReconciler;

impl MergeReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Merge `snapshot` into `collection`.
    ///
    /// An id listed twice in the snapshot keeps its first position and the
    /// values of its last occurrence.
    pub fn merge(&self, collection: &mut MediaCollection, snapshot: Vec<MediaItem>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        let mut fresh: Vec<MediaItem> = Vec::new();
        let mut fresh_index: HashMap<MediaId, usize> = HashMap::new();
        let mut known: HashMap<MediaId, MediaItem> = HashMap::new();

        for item in snapshot {
            if collection.contains(&item.id) {
                known.insert(item.id.clone(), item);
            } else if let Some(&pos) = fresh_index.get(&item.id) {
                fresh[pos] = item;
            } else {
                fresh_index.insert(item.id.clone(), fresh.len());
                fresh.push(item);
            }
        }

        outcome.inserted = fresh.len();

        let current = std::mem::take(collection).into_items();
        let mut merged = fresh;
        merged.reserve(known.len());

        for mut existing in current {
            match known.remove(&existing.id) {
                Some(incoming) => {
                    if existing.apply_update(&incoming) {
                        outcome.updated += 1;
                    }
                    merged.push(existing);
                }
                None => outcome.removed += 1,
            }
        }

        *collection = MediaCollection::from_ordered(merged);
        outcome
    }
}
