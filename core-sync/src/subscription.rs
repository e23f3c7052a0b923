//! # Change Subscription
//!
//! Owns the live push-channel subscription for the attached owner.
//!
//! The subscription is an owned resource ([`ActiveSubscription`]): a delivery
//! task plus the token that stops it. It is acquired by
//! [`ChangeSubscription::subscribe`] and released by
//! [`ChangeSubscription::unsubscribe`], by subscribing for another owner, or
//! by dropping the `ChangeSubscription`.
//!
//! Snapshots are merged in delivery order, one at a time. A channel error is
//! logged and reported on the event bus, and the subscription keeps
//! listening. When the remote side ends the stream the delivery task stops
//! and a later `subscribe` for the same owner acquires a new channel.

use std::sync::Arc;

use bridge_traits::{MediaRecord, RecordStore, SnapshotStream};
use core_async::sync::{CancellationToken, Mutex};
use core_async::task::JoinHandle;
use core_library::{MediaItem, OwnerId};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SessionEvent};
use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::store::LibraryStore;

/// A running delivery task for one owner.
///
/// Dropping it cancels the task; [`release`](Self::release) also waits for
/// the task to finish.
struct ActiveSubscription {
    owner: OwnerId,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ActiveSubscription {
    fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    async fn release(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(owner_id = %self.owner, error = %err, "Delivery task did not shut down cleanly");
            }
        }
    }
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct ChangeSubscription {
    record_store: Arc<dyn RecordStore>,
    store: Arc<LibraryStore>,
    events: EventBus,
    active: Mutex<Option<ActiveSubscription>>,
}

impl ChangeSubscription {
    pub fn new(record_store: Arc<dyn RecordStore>, store: Arc<LibraryStore>, events: EventBus) -> Self {
        Self {
            record_store,
            store,
            events,
            active: Mutex::new(None),
        }
    }

    /// Start delivering snapshots for `owner`.
    ///
    /// A no-op while a live subscription for the same owner exists. A live
    /// subscription for another owner is released first.
    ///
    /// # Errors
    ///
    /// `SyncError::Subscription` when the record store refuses the channel.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn subscribe(&self, owner: &OwnerId) -> Result<()> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.owner == *owner && current.is_running() {
                debug!("Already subscribed");
                return Ok(());
            }
        }

        if let Some(previous) = active.take() {
            debug!(previous_owner = %previous.owner, "Releasing previous subscription");
            previous.release().await;
        }

        let stream = self
            .record_store
            .subscribe(owner.as_str())
            .await
            .map_err(|err| SyncError::Subscription(err.to_string()))?;

        let epoch = self.store.epoch().await;
        let token = CancellationToken::new();
        let handle = core_async::spawn(deliver(
            stream,
            Arc::clone(&self.store),
            self.events.clone(),
            owner.clone(),
            epoch,
            token.clone(),
        ));

        *active = Some(ActiveSubscription {
            owner: owner.clone(),
            token,
            handle: Some(handle),
        });

        info!("Subscribed to remote changes");
        self.events
            .emit(CoreEvent::Session(SessionEvent::Attached {
                owner_id: owner.to_string(),
            }))
            .ok();

        Ok(())
    }

    /// Stop delivery. No snapshot is applied after this returns.
    ///
    /// Returns the owner that was subscribed, if any.
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self) -> Option<OwnerId> {
        let previous = self.active.lock().await.take()?;
        let owner = previous.owner.clone();
        previous.release().await;

        info!(owner_id = %owner, "Unsubscribed from remote changes");
        self.events
            .emit(CoreEvent::Session(SessionEvent::Detached {
                owner_id: owner.to_string(),
            }))
            .ok();

        Some(owner)
    }

    /// Owner of the live subscription, if the delivery task is still running.
    pub async fn active_owner(&self) -> Option<OwnerId> {
        self.active
            .lock()
            .await
            .as_ref()
            .filter(|active| active.is_running())
            .map(|active| active.owner.clone())
    }

    pub async fn is_active(&self) -> bool {
        self.active_owner().await.is_some()
    }
}

impl std::fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription").finish_non_exhaustive()
    }
}

fn to_items(records: Vec<MediaRecord>) -> Vec<MediaItem> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            MediaItem::try_from(record)
                .map_err(|err| warn!(record_id = %id, error = %err, "Dropping invalid record from snapshot"))
                .ok()
        })
        .collect()
}

async fn deliver(
    mut stream: SnapshotStream,
    store: Arc<LibraryStore>,
    events: EventBus,
    owner: OwnerId,
    epoch: u64,
    token: CancellationToken,
) {
    loop {
        let next = core_async::select! {
            biased;
            _ = token.cancelled() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(records)) => {
                let received = records.len();
                let items = to_items(records);

                match store.apply_snapshot(epoch, items).await {
                    Some(outcome) => {
                        debug!(
                            owner_id = %owner,
                            received,
                            inserted = outcome.inserted,
                            updated = outcome.updated,
                            removed = outcome.removed,
                            "Snapshot merged"
                        );
                        events
                            .emit(CoreEvent::Library(LibraryEvent::SnapshotMerged {
                                inserted: outcome.inserted,
                                updated: outcome.updated,
                                removed: outcome.removed,
                            }))
                            .ok();
                    }
                    None => {
                        debug!(owner_id = %owner, "Session changed, stopping delivery");
                        break;
                    }
                }
            }
            Some(Err(err)) => {
                warn!(owner_id = %owner, error = %err, "Push channel reported an error");
                events
                    .emit(CoreEvent::Library(LibraryEvent::SubscriptionFailed {
                        message: err.to_string(),
                    }))
                    .ok();
            }
            None => {
                info!(owner_id = %owner, "Push channel closed by remote");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, PageCursor, RecordPage};
    use futures::channel::mpsc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    type Feed = mpsc::UnboundedSender<BridgeResult<Vec<MediaRecord>>>;

    /// Hands out one channel per `subscribe` call and keeps the senders.
    #[derive(Default)]
    struct FeedStore {
        feeds: StdMutex<Vec<(String, Feed)>>,
        subscribe_calls: AtomicUsize,
    }

    impl FeedStore {
        fn feed(&self, index: usize) -> Feed {
            self.feeds.lock().unwrap()[index].1.clone()
        }

        fn calls(&self) -> usize {
            self.subscribe_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordStore for FeedStore {
        async fn query_page(
            &self,
            _owner_id: &str,
            _cursor: &PageCursor,
            _limit: u32,
        ) -> BridgeResult<RecordPage> {
            Ok(RecordPage::empty())
        }

        async fn delete_record(&self, _id: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn subscribe(&self, owner_id: &str) -> BridgeResult<SnapshotStream> {
            self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded();
            self.feeds.lock().unwrap().push((owner_id.to_string(), tx));
            Ok(rx.boxed())
        }
    }

    fn record(id: &str, title: &str) -> MediaRecord {
        MediaRecord {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            title: title.to_string(),
            media_ref: format!("media/{}.mp4", id),
            thumbnail_ref: format!("thumbs/{}.jpg", id),
            duration_ms: 1_000,
            size_bytes: 100,
            aspect_ratio_key: None,
            aspect_ratio_width: 4,
            aspect_ratio_height: 5,
            created_at: None,
        }
    }

    async fn wait_for_len(store: &LibraryStore, len: usize) {
        let mut rx = store.subscribe();
        while rx.borrow_and_update().len() != len {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    fn setup() -> (Arc<FeedStore>, Arc<LibraryStore>, ChangeSubscription) {
        let records = Arc::new(FeedStore::default());
        let store = Arc::new(LibraryStore::new());
        let subscription = ChangeSubscription::new(
            records.clone() as Arc<dyn RecordStore>,
            Arc::clone(&store),
            EventBus::new(16),
        );
        (records, store, subscription)
    }

    #[core_async::test]
    async fn test_snapshots_are_merged_in_order() {
        let (records, store, subscription) = setup();
        let owner = OwnerId::from("owner-1");
        subscription.subscribe(&owner).await.unwrap();

        let feed = records.feed(0);
        feed.unbounded_send(Ok(vec![record("a", "A")])).unwrap();
        feed.unbounded_send(Ok(vec![record("a", "A2"), record("b", "B")]))
            .unwrap();

        wait_for_len(&store, 2).await;
        let view = store.view();
        assert_eq!(view.items[0].id.as_str(), "b");
        assert_eq!(view.items[1].title, "A2");
    }

    #[core_async::test]
    async fn test_subscribe_twice_is_noop() {
        let (records, _store, subscription) = setup();
        let owner = OwnerId::from("owner-1");

        subscription.subscribe(&owner).await.unwrap();
        subscription.subscribe(&owner).await.unwrap();

        assert_eq!(records.calls(), 1);
        assert_eq!(subscription.active_owner().await, Some(owner));
    }

    #[core_async::test]
    async fn test_owner_switch_releases_previous() {
        let (records, _store, subscription) = setup();

        subscription.subscribe(&OwnerId::from("owner-1")).await.unwrap();
        subscription.subscribe(&OwnerId::from("owner-2")).await.unwrap();

        assert_eq!(records.calls(), 2);
        assert!(records.feed(0).is_closed());
        assert!(!records.feed(1).is_closed());
        assert_eq!(
            subscription.active_owner().await,
            Some(OwnerId::from("owner-2"))
        );
    }

    #[core_async::test]
    async fn test_nothing_applied_after_unsubscribe() {
        let (records, store, subscription) = setup();
        subscription.subscribe(&OwnerId::from("owner-1")).await.unwrap();
        let feed = records.feed(0);

        feed.unbounded_send(Ok(vec![record("a", "A")])).unwrap();
        wait_for_len(&store, 1).await;

        assert_eq!(subscription.unsubscribe().await, Some(OwnerId::from("owner-1")));
        assert!(feed.is_closed());
        assert!(feed.unbounded_send(Ok(Vec::new())).is_err());
        assert_eq!(store.view().len(), 1);
        assert!(!subscription.is_active().await);
        assert_eq!(subscription.unsubscribe().await, None);
    }

    #[core_async::test]
    async fn test_channel_error_keeps_listening() {
        let (records, store, subscription) = setup();
        let mut events = subscription.events.subscribe();
        subscription.subscribe(&OwnerId::from("owner-1")).await.unwrap();
        let feed = records.feed(0);

        feed.unbounded_send(Err(BridgeError::OperationFailed("quota".to_string())))
            .unwrap();
        feed.unbounded_send(Ok(vec![record("a", "A")])).unwrap();

        wait_for_len(&store, 1).await;
        assert!(subscription.is_active().await);
        assert!(store.view().error.is_none());

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, CoreEvent::Library(LibraryEvent::SubscriptionFailed { .. })) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[core_async::test]
    async fn test_resubscribe_after_remote_close() {
        let (records, _store, subscription) = setup();
        let owner = OwnerId::from("owner-1");
        subscription.subscribe(&owner).await.unwrap();

        records.feed(0).close_channel();
        while subscription.is_active().await {
            core_async::task::yield_now().await;
        }

        subscription.subscribe(&owner).await.unwrap();
        assert_eq!(records.calls(), 2);
        assert!(subscription.is_active().await);
    }

    #[core_async::test]
    async fn test_subscribe_failure_is_reported() {
        struct Refusing;

        #[async_trait]
        impl RecordStore for Refusing {
            async fn query_page(
                &self,
                _owner_id: &str,
                _cursor: &PageCursor,
                _limit: u32,
            ) -> BridgeResult<RecordPage> {
                Ok(RecordPage::empty())
            }

            async fn delete_record(&self, _id: &str) -> BridgeResult<()> {
                Ok(())
            }

            async fn subscribe(&self, _owner_id: &str) -> BridgeResult<SnapshotStream> {
                Err(BridgeError::PermissionDenied("rules".to_string()))
            }
        }

        let subscription = ChangeSubscription::new(
            Arc::new(Refusing),
            Arc::new(LibraryStore::new()),
            EventBus::new(4),
        );
        let err = subscription
            .subscribe(&OwnerId::from("owner-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Subscription(_)));
        assert!(!subscription.is_active().await);
    }

    #[core_async::test]
    async fn test_reset_stops_stale_delivery() {
        let (records, store, subscription) = setup();
        subscription.subscribe(&OwnerId::from("owner-1")).await.unwrap();

        store.reset().await;
        records
            .feed(0)
            .unbounded_send(Ok(vec![record("a", "A")]))
            .unwrap();

        while subscription.is_active().await {
            core_async::task::yield_now().await;
        }
        assert!(store.view().is_empty());
    }
}
