//! # Library Store
//!
//! Single mutation entry point for [`LibraryState`].
//!
//! Every write goes through [`LibraryStore::mutate`] (or its epoch-checked
//! variant) under one async mutex, and every write publishes a fresh
//! [`LibraryView`] on a `watch` channel for the UI.
//!
//! ## Session epochs
//!
//! [`LibraryStore::reset`] starts a new session epoch. Work that began in an
//! older epoch (a page query, a snapshot in flight) is discarded by
//! [`LibraryStore::mutate_in_epoch`] instead of leaking into the new session.

use core_async::sync::{watch, Mutex};
use core_library::{LibraryState, LibraryView, MediaItem};
use tracing::debug;

use crate::reconciler::{MergeOutcome, MergeReconciler};

#[derive(Debug, Default)]
struct Session {
    epoch: u64,
    state: LibraryState,
}

pub struct LibraryStore {
    session: Mutex<Session>,
    view_tx: watch::Sender<LibraryView>,
    reconciler: MergeReconciler,
}

impl LibraryStore {
    pub fn new() -> Self {
        let (view_tx, _) = watch::channel(LibraryView::default());
        Self {
            session: Mutex::new(Session::default()),
            view_tx,
            reconciler: MergeReconciler::new(),
        }
    }

    /// Current session epoch.
    pub async fn epoch(&self) -> u64 {
        self.session.lock().await.epoch
    }

    /// Latest published view.
    pub fn view(&self) -> LibraryView {
        self.view_tx.borrow().clone()
    }

    /// Receiver notified after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<LibraryView> {
        self.view_tx.subscribe()
    }

    /// Apply `f` to the state and publish the result.
    pub async fn mutate<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut LibraryState) -> R,
    {
        let mut session = self.session.lock().await;
        let result = f(&mut session.state);
        self.publish(&session.state);
        result
    }

    /// Like [`mutate`](Self::mutate), but only while `epoch` is current.
    ///
    /// Returns `None` (and leaves the state untouched) for stale work.
    pub async fn mutate_in_epoch<F, R>(&self, epoch: u64, f: F) -> Option<R>
    where
        F: FnOnce(&mut LibraryState) -> R,
    {
        let mut session = self.session.lock().await;
        if session.epoch != epoch {
            debug!(
                stale_epoch = epoch,
                current_epoch = session.epoch,
                "Discarding result from previous session"
            );
            return None;
        }
        let result = f(&mut session.state);
        self.publish(&session.state);
        Some(result)
    }

    /// Merge a pushed snapshot, unless it belongs to an older session.
    pub async fn apply_snapshot(&self, epoch: u64, snapshot: Vec<MediaItem>) -> Option<MergeOutcome> {
        let reconciler = self.reconciler;
        self.mutate_in_epoch(epoch, move |state| {
            let outcome = reconciler.merge(&mut state.collection, snapshot);
            state.refresh_empty();
            outcome
        })
        .await
    }

    /// Mark a page fetch of `epoch` as outstanding.
    ///
    /// Returns `false` when the session moved on before the fetch started.
    pub async fn begin_loading(&self, epoch: u64) -> bool {
        self.mutate_in_epoch(epoch, |state| state.loading = true)
            .await
            .is_some()
    }

    /// Drop the collection and flags and start a new epoch.
    ///
    /// `deleting` carries over: remote deletions are not tied to a session.
    pub async fn reset(&self) -> u64 {
        let mut session = self.session.lock().await;
        session.epoch += 1;
        let deleting = session.state.deleting;
        session.state.reset();
        session.state.deleting = deleting;
        self.publish(&session.state);
        session.epoch
    }

    pub async fn clear_error(&self) {
        self.mutate(|state| state.clear_error()).await
    }

    fn publish(&self, state: &LibraryState) {
        self.view_tx.send_replace(state.view());
    }
}

impl Default for LibraryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStore")
            .field("items", &self.view_tx.borrow().items.len())
            .finish()
    }
}
