//! # Deletion Coordinator
//!
//! Removes one media item from remote storage: the media blob, then the
//! thumbnail blob, then the metadata record. Each step only runs after the
//! previous one succeeded. Nothing is rolled back.
//!
//! Only one cascade runs at a time. A second `delete_item` while one is in
//! flight is rejected with [`SyncError::DeletionInProgress`].

use std::fmt;
use std::sync::Arc;

use bridge_traits::{BlobStore, BridgeError, Clock, RecordStore};
use core_library::{ErrorCode, MediaItem};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use core_runtime::logging::strip_ref;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::gate::{Gate, GateGuard};
use crate::ledger::{CleanupEntry, CleanupLedger};
use crate::store::LibraryStore;

/// One step of the deletion cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStep {
    MediaBlob,
    ThumbnailBlob,
    Record,
}

impl DeletionStep {
    /// All steps in execution order.
    pub const CASCADE: [DeletionStep; 3] = [
        DeletionStep::MediaBlob,
        DeletionStep::ThumbnailBlob,
        DeletionStep::Record,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStep::MediaBlob => "media_blob",
            DeletionStep::ThumbnailBlob => "thumbnail_blob",
            DeletionStep::Record => "record",
        }
    }
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The step that stopped a cascade.
#[derive(Debug)]
pub(crate) struct StepFailure {
    pub(crate) step: DeletionStep,
    pub(crate) error: BridgeError,
}

/// Steps from `failed` onwards, taken from `steps`.
pub(crate) fn remaining_from(steps: &[DeletionStep], failed: DeletionStep) -> Vec<DeletionStep> {
    steps
        .iter()
        .copied()
        .skip_while(|step| *step != failed)
        .collect()
}

/// Steps of the full cascade that are not in `remaining`.
fn completed_given(remaining: &[DeletionStep]) -> Vec<DeletionStep> {
    DeletionStep::CASCADE
        .iter()
        .copied()
        .filter(|step| !remaining.contains(step))
        .collect()
}

pub struct DeletionCoordinator {
    record_store: Arc<dyn RecordStore>,
    blob_store: Arc<dyn BlobStore>,
    pub(crate) store: Arc<LibraryStore>,
    pub(crate) ledger: Arc<CleanupLedger>,
    pub(crate) events: EventBus,
    pub(crate) clock: Arc<dyn Clock>,
    gate: Gate,
}

impl DeletionCoordinator {
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        blob_store: Arc<dyn BlobStore>,
        store: Arc<LibraryStore>,
        ledger: Arc<CleanupLedger>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            record_store,
            blob_store,
            store,
            ledger,
            events,
            clock,
            gate: Gate::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<CleanupLedger> {
        &self.ledger
    }

    /// Whether a cascade (user deletion or sweep) currently holds the gate.
    pub fn is_deleting(&self) -> bool {
        self.gate.is_held()
    }

    pub(crate) fn try_begin(&self) -> Option<GateGuard<'_>> {
        self.gate.try_enter()
    }

    /// Delete `item` from remote storage and, on success, from the collection.
    ///
    /// If the item has a pending ledger entry from an earlier failure, only
    /// its remaining steps run.
    ///
    /// # Inconsistency window
    ///
    /// The three stores are not updated atomically and completed steps are
    /// never compensated. When a step fails:
    ///
    /// - media blob fails: nothing changed remotely.
    /// - thumbnail blob fails: the record still points at a deleted media
    ///   blob; the item stays listed but cannot play.
    /// - record fails: both blobs are gone while the record (and the listed
    ///   item) remain.
    ///
    /// The failure is recorded in the [`CleanupLedger`] so the reconciliation
    /// sweep or a retry can finish the job. Until then, remote state and the
    /// collection disagree.
    ///
    /// # Errors
    ///
    /// - `DeletionInProgress` when another cascade is running
    /// - `PartialDeletion` naming the failed step and the steps that completed
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn delete_item(&self, item: &MediaItem) -> Result<()> {
        let _gate = match self.gate.try_enter() {
            Some(guard) => guard,
            None => {
                warn!("Rejecting deletion, another one is in progress");
                return Err(SyncError::DeletionInProgress {
                    item_id: item.id.to_string(),
                });
            }
        };

        let steps = match self.ledger.get(&item.id).await {
            Some(entry) => {
                debug!(remaining = ?entry.remaining, "Resuming interrupted deletion");
                entry.remaining
            }
            None => DeletionStep::CASCADE.to_vec(),
        };

        self.store.mutate(|state| state.deleting = true).await;

        match self.run_cascade(item, &steps, false).await {
            Ok(()) => {
                self.ledger.remove(&item.id).await;
                let removed = self
                    .store
                    .mutate(|state| {
                        let removed = state.remove_item(&item.id).is_some();
                        state.deleting = false;
                        removed
                    })
                    .await;

                info!(removed, "Item deleted");
                self.events
                    .emit(CoreEvent::Library(LibraryEvent::ItemDeleted {
                        item_id: item.id.to_string(),
                    }))
                    .ok();
                Ok(())
            }
            Err(failure) => {
                let remaining = remaining_from(&steps, failure.step);
                let completed = completed_given(&remaining);
                let message = failure.error.to_string();

                warn!(
                    step = %failure.step,
                    completed = ?completed,
                    error = %failure.error,
                    "Deletion stopped part-way"
                );

                self.ledger
                    .record(CleanupEntry {
                        item: item.clone(),
                        remaining,
                        failed_at: self.clock.now(),
                        last_error: message.clone(),
                        attempts: 1,
                    })
                    .await;

                let error_message = format!("Failed to delete \"{}\": {}", item.title, message);
                self.store
                    .mutate(move |state| {
                        state.deleting = false;
                        state.set_error(ErrorCode::Deletion, error_message);
                    })
                    .await;

                self.events
                    .emit(CoreEvent::Library(LibraryEvent::DeletionFailed {
                        item_id: item.id.to_string(),
                        step: failure.step.to_string(),
                        message: message.clone(),
                    }))
                    .ok();

                Err(SyncError::PartialDeletion {
                    item_id: item.id.to_string(),
                    step: failure.step,
                    completed,
                    message,
                })
            }
        }
    }

    /// Run `steps` in order, stopping at the first failure.
    ///
    /// With `tolerate_missing`, a `NotFound` from the store counts as done.
    pub(crate) async fn run_cascade(
        &self,
        item: &MediaItem,
        steps: &[DeletionStep],
        tolerate_missing: bool,
    ) -> std::result::Result<(), StepFailure> {
        for &step in steps {
            let result = match step {
                DeletionStep::MediaBlob => self.blob_store.delete_blob(&item.media_ref).await,
                DeletionStep::ThumbnailBlob if !item.has_thumbnail() => {
                    debug!("No thumbnail to delete");
                    Ok(())
                }
                DeletionStep::ThumbnailBlob => {
                    self.blob_store.delete_blob(&item.thumbnail_ref).await
                }
                DeletionStep::Record => self.record_store.delete_record(item.id.as_str()).await,
            };

            match result {
                Ok(()) => debug!(%step, reference = %step_ref(item, step), "Step completed"),
                Err(err) if tolerate_missing && err.is_not_found() => {
                    debug!(%step, "Already gone")
                }
                Err(error) => return Err(StepFailure { step, error }),
            }
        }

        Ok(())
    }
}

fn step_ref(item: &MediaItem, step: DeletionStep) -> &str {
    match step {
        DeletionStep::MediaBlob => strip_ref(&item.media_ref),
        DeletionStep::ThumbnailBlob => strip_ref(&item.thumbnail_ref),
        DeletionStep::Record => item.id.as_str(),
    }
}

impl fmt::Debug for DeletionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionCoordinator")
            .field("deleting", &self.gate.is_held())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{FixedClock, PageCursor, RecordPage, SnapshotStream};
    use chrono::{TimeZone, Utc};
    use core_async::sync::Notify;
    use core_library::{AspectRatio, MediaCollection, MediaId, OwnerId};
    use mockall::predicate::*;
    use mockall::{mock, Sequence};

    mock! {
        pub Records {}

        #[async_trait]
        impl RecordStore for Records {
            async fn query_page(
                &self,
                owner_id: &str,
                cursor: &PageCursor,
                limit: u32,
            ) -> BridgeResult<RecordPage>;
            async fn delete_record(&self, id: &str) -> BridgeResult<()>;
            async fn subscribe(&self, owner_id: &str) -> BridgeResult<SnapshotStream>;
        }
    }

    mock! {
        pub Blobs {}

        #[async_trait]
        impl BlobStore for Blobs {
            async fn delete_blob(&self, reference: &str) -> BridgeResult<()>;
        }
    }

    fn item(id: &str) -> MediaItem {
        MediaItem {
            id: MediaId::from(id),
            owner_id: OwnerId::from("owner-1"),
            title: format!("Clip {}", id),
            media_ref: format!("media/{}.mp4", id),
            thumbnail_ref: format!("thumbs/{}.jpg", id),
            duration_ms: 3_000,
            size_bytes: 2_048,
            aspect_ratio: AspectRatio::Portrait9x16,
            aspect_ratio_width: 1080,
            aspect_ratio_height: 1920,
            created_at: None,
        }
    }

    async fn coordinator_with(
        records: impl RecordStore + 'static,
        blobs: impl BlobStore + 'static,
        items: Vec<MediaItem>,
    ) -> DeletionCoordinator {
        let store = Arc::new(LibraryStore::new());
        store
            .mutate(|state| state.collection = MediaCollection::from_ordered(items))
            .await;
        DeletionCoordinator::new(
            Arc::new(records),
            Arc::new(blobs),
            store,
            Arc::new(CleanupLedger::new()),
            EventBus::new(16),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())),
        )
    }

    #[core_async::test]
    async fn test_cascade_runs_in_order() {
        let mut seq = Sequence::new();
        let mut blobs = MockBlobs::new();
        let mut records = MockRecords::new();

        blobs
            .expect_delete_blob()
            .with(eq("media/a.mp4"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        blobs
            .expect_delete_blob()
            .with(eq("thumbs/a.jpg"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        records
            .expect_delete_record()
            .with(eq("a"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let coordinator = coordinator_with(records, blobs, vec![item("a"), item("b")]).await;
        coordinator.delete_item(&item("a")).await.unwrap();

        let view = coordinator.store.view();
        assert!(!view.contains(&MediaId::from("a")));
        assert_eq!(view.len(), 1);
        assert!(!view.deleting);
        assert!(coordinator.ledger().is_empty().await);
    }

    #[core_async::test]
    async fn test_thumbnail_failure_skips_record() {
        let mut blobs = MockBlobs::new();
        let mut records = MockRecords::new();

        blobs
            .expect_delete_blob()
            .with(eq("media/a.mp4"))
            .times(1)
            .returning(|_| Ok(()));
        blobs
            .expect_delete_blob()
            .with(eq("thumbs/a.jpg"))
            .times(1)
            .returning(|_| Err(BridgeError::PermissionDenied("thumbs".to_string())));
        records.expect_delete_record().times(0);

        let coordinator = coordinator_with(records, blobs, vec![item("a")]).await;
        let err = coordinator.delete_item(&item("a")).await.unwrap_err();

        match err {
            SyncError::PartialDeletion {
                step, completed, ..
            } => {
                assert_eq!(step, DeletionStep::ThumbnailBlob);
                assert_eq!(completed, vec![DeletionStep::MediaBlob]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let view = coordinator.store.view();
        assert!(view.contains(&MediaId::from("a")));
        assert!(!view.deleting);
        assert_eq!(view.error.unwrap().code, Some(ErrorCode::Deletion));

        let entry = coordinator.ledger().get(&MediaId::from("a")).await.unwrap();
        assert_eq!(
            entry.remaining,
            vec![DeletionStep::ThumbnailBlob, DeletionStep::Record]
        );
        assert_eq!(entry.failed_at, Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
    }

    #[core_async::test]
    async fn test_retry_resumes_from_failed_step() {
        let mut blobs = MockBlobs::new();
        let mut records = MockRecords::new();
        let mut seq = Sequence::new();

        blobs
            .expect_delete_blob()
            .with(eq("media/a.mp4"))
            .times(1)
            .returning(|_| Ok(()));
        blobs
            .expect_delete_blob()
            .with(eq("thumbs/a.jpg"))
            .times(1)
            .returning(|_| Ok(()));
        records
            .expect_delete_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::OperationFailed("offline".to_string())));
        records
            .expect_delete_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let coordinator = coordinator_with(records, blobs, vec![item("a")]).await;
        assert!(coordinator.delete_item(&item("a")).await.is_err());
        coordinator.delete_item(&item("a")).await.unwrap();

        assert!(coordinator.store.view().is_empty());
        assert!(coordinator.ledger().is_empty().await);
    }

    #[core_async::test]
    async fn test_missing_thumbnail_is_skipped() {
        let mut blobs = MockBlobs::new();
        let mut records = MockRecords::new();

        blobs
            .expect_delete_blob()
            .with(eq("media/a.mp4"))
            .times(1)
            .returning(|_| Ok(()));
        records.expect_delete_record().times(1).returning(|_| Ok(()));

        let mut bare = item("a");
        bare.thumbnail_ref = String::new();

        let coordinator = coordinator_with(records, blobs, vec![bare.clone()]).await;
        coordinator.delete_item(&bare).await.unwrap();
    }

    struct BlockingBlobs {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl BlobStore for BlockingBlobs {
        async fn delete_blob(&self, _reference: &str) -> BridgeResult<()> {
            self.release.notified().await;
            Ok(())
        }
    }

    #[core_async::test]
    async fn test_concurrent_deletion_is_rejected() {
        let release = Arc::new(Notify::new());
        let mut records = MockRecords::new();
        records.expect_delete_record().times(1).returning(|_| Ok(()));

        let coordinator = Arc::new(
            coordinator_with(
                records,
                BlockingBlobs {
                    release: Arc::clone(&release),
                },
                vec![item("a"), item("b")],
            )
            .await,
        );

        let background = Arc::clone(&coordinator);
        let first = core_async::spawn(async move { background.delete_item(&item("a")).await });

        while !coordinator.store.view().deleting {
            core_async::task::yield_now().await;
        }

        let err = coordinator.delete_item(&item("b")).await.unwrap_err();
        assert!(matches!(err, SyncError::DeletionInProgress { ref item_id } if item_id == "b"));

        release.notify_one();
        core_async::task::yield_now().await;
        release.notify_one();
        first.await.unwrap().unwrap();

        let view = coordinator.store.view();
        assert_eq!(view.len(), 1);
        assert!(view.contains(&MediaId::from("b")));
        assert!(!coordinator.is_deleting());
    }

    #[test]
    fn test_remaining_from() {
        assert_eq!(
            remaining_from(&DeletionStep::CASCADE, DeletionStep::Record),
            vec![DeletionStep::Record]
        );
        assert_eq!(
            completed_given(&[DeletionStep::ThumbnailBlob, DeletionStep::Record]),
            vec![DeletionStep::MediaBlob]
        );
        assert_eq!(DeletionStep::ThumbnailBlob.to_string(), "thumbnail_blob");
    }
}
