//! Ledger of deletion cascades that stopped part-way.
//!
//! Each entry keeps the item as it was when the user deleted it and the steps
//! that still have to run. The [`ReconciliationSweep`](crate::sweep) works the
//! ledger down.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use core_async::sync::Mutex;
use core_library::{MediaId, MediaItem};
use serde::{Deserialize, Serialize};

use crate::deletion::DeletionStep;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupEntry {
    pub item: MediaItem,
    /// Steps not yet completed, in cascade order
    pub remaining: Vec<DeletionStep>,
    pub failed_at: DateTime<Utc>,
    pub last_error: String,
    /// Failed attempts so far, including the original deletion
    pub attempts: u32,
}

impl CleanupEntry {
    pub fn item_id(&self) -> &MediaId {
        &self.item.id
    }
}

#[derive(Debug, Default)]
pub struct CleanupLedger {
    entries: Mutex<HashMap<MediaId, CleanupEntry>>,
}

impl CleanupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. An existing entry for the same item is replaced and
    /// its attempt count carried over.
    pub async fn record(&self, mut entry: CleanupEntry) {
        let mut entries = self.entries.lock().await;
        if let Some(previous) = entries.get(entry.item_id()) {
            entry.attempts = entry.attempts.max(previous.attempts + 1);
        }
        entries.insert(entry.item.id.clone(), entry);
    }

    pub async fn get(&self, id: &MediaId) -> Option<CleanupEntry> {
        self.entries.lock().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &MediaId) -> Option<CleanupEntry> {
        self.entries.lock().await.remove(id)
    }

    /// Pending entries, oldest failure first.
    pub async fn pending(&self) -> Vec<CleanupEntry> {
        let mut pending: Vec<_> = self.entries.lock().await.values().cloned().collect();
        pending.sort_by(|a, b| {
            a.failed_at
                .cmp(&b.failed_at)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        pending
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
