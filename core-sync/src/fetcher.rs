//! # Paginated Fetcher
//!
//! Pulls the owner's items from the record store one page at a time.
//!
//! - Re-entrancy guarded: a call made while another is outstanding returns
//!   [`FetchOutcome::AlreadyInProgress`] without querying. The guard belongs
//!   to the session epoch, so a query left over from before a reset never
//!   blocks the first page of the new session.
//! - Ids already in the collection (for example inserted by a pushed
//!   snapshot) are skipped before appending.
//! - The cursor only advances after a non-empty page was appended. Empty
//!   pages and failures leave it where it was.
//! - No retries. A failed query is reported once and left to the caller.
//!
//! The cursor is tagged with the session epoch it belongs to, so a reset of
//! the [`LibraryStore`] implicitly rewinds it to the start.

use std::sync::Arc;

use bridge_traits::{PageCursor, RecordStore};
use core_async::sync::Mutex;
use core_library::{ErrorCode, MediaItem, OwnerId};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::gate::EpochGate;
use crate::store::LibraryStore;

/// Result of one [`PaginatedFetcher::fetch_next_page`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was appended and the cursor advanced.
    Appended {
        added: usize,
        /// Duplicates and records that failed validation
        skipped: usize,
        /// Fewer records than requested came back
        exhausted: bool,
    },
    /// No records. Not an error.
    Empty,
    /// Another fetch is outstanding; nothing was requested.
    AlreadyInProgress,
    /// The session was reset while the query ran; the page was dropped.
    Discarded,
}

#[derive(Debug, Default)]
struct CursorState {
    epoch: u64,
    cursor: PageCursor,
}

pub struct PaginatedFetcher {
    record_store: Arc<dyn RecordStore>,
    store: Arc<LibraryStore>,
    events: EventBus,
    page_size: u32,
    in_flight: EpochGate,
    cursor: Mutex<CursorState>,
}

impl PaginatedFetcher {
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        store: Arc<LibraryStore>,
        events: EventBus,
        page_size: u32,
    ) -> Self {
        Self {
            record_store,
            store,
            events,
            page_size,
            in_flight: EpochGate::new(),
            cursor: Mutex::new(CursorState::default()),
        }
    }

    /// Cursor the next call will resume from.
    pub async fn cursor(&self) -> PageCursor {
        let epoch = self.store.epoch().await;
        self.cursor_for(epoch).await
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_held()
    }

    async fn cursor_for(&self, epoch: u64) -> PageCursor {
        let state = self.cursor.lock().await;
        if state.epoch == epoch {
            state.cursor.clone()
        } else {
            PageCursor::Start
        }
    }

    /// Fetch the next page for `owner` and append it to the collection.
    ///
    /// # Errors
    ///
    /// `SyncError::Fetch` when the record store query fails. The error is
    /// also stored in the library error slot.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn fetch_next_page(&self, owner: &OwnerId) -> Result<FetchOutcome> {
        let epoch = self.store.epoch().await;
        let _guard = match self.in_flight.try_enter(epoch) {
            Some(guard) => guard,
            None => {
                debug!("Fetch already in progress, ignoring call");
                return Ok(FetchOutcome::AlreadyInProgress);
            }
        };

        if !self.store.begin_loading(epoch).await {
            return Ok(FetchOutcome::Discarded);
        }
        let cursor = self.cursor_for(epoch).await;
        debug!(?cursor, page_size = self.page_size, "Querying page");

        let page = match self
            .record_store
            .query_page(owner.as_str(), &cursor, self.page_size)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                let message = format!("Failed to load media: {}", err);
                warn!(error = %err, "Page query failed");

                let error_message = message.clone();
                self.store
                    .mutate_in_epoch(epoch, move |state| {
                        state.loading = false;
                        if state.collection.is_empty() {
                            state.empty = true;
                        }
                        state.set_error(ErrorCode::Fetch, error_message);
                    })
                    .await;

                self.events
                    .emit(CoreEvent::Library(LibraryEvent::FetchFailed {
                        message: message.clone(),
                    }))
                    .ok();
                return Err(SyncError::Fetch(message));
            }
        };

        if page.is_empty() {
            let applied = self
                .store
                .mutate_in_epoch(epoch, |state| {
                    state.loading = false;
                    if state.collection.is_empty() {
                        state.empty = true;
                    }
                })
                .await;

            if applied.is_none() {
                return Ok(FetchOutcome::Discarded);
            }

            debug!("Page empty");
            self.events
                .emit(CoreEvent::Library(LibraryEvent::PageEmpty))
                .ok();
            return Ok(FetchOutcome::Empty);
        }

        let received = page.records.len();
        let exhausted = received < self.page_size as usize || page.boundary.is_none();

        let mut invalid = 0;
        let items: Vec<MediaItem> = page
            .records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                match MediaItem::try_from(record) {
                    Ok(item) => Some(item),
                    Err(err) => {
                        warn!(record_id = %id, error = %err, "Skipping invalid record");
                        invalid += 1;
                        None
                    }
                }
            })
            .collect();

        let appended = self
            .store
            .mutate_in_epoch(epoch, move |state| {
                let outcome = state.collection.append_unique(items);
                state.loading = false;
                state.refresh_empty();
                outcome
            })
            .await;

        let Some(appended) = appended else {
            return Ok(FetchOutcome::Discarded);
        };

        if let Some(boundary) = page.boundary {
            let mut state = self.cursor.lock().await;
            *state = CursorState {
                epoch,
                cursor: PageCursor::After(boundary),
            };
        }

        let skipped = appended.skipped + invalid;
        info!(
            added = appended.added,
            skipped,
            exhausted,
            "Page loaded"
        );
        self.events
            .emit(CoreEvent::Library(LibraryEvent::PageLoaded {
                added: appended.added,
                skipped,
                exhausted,
            }))
            .ok();

        Ok(FetchOutcome::Appended {
            added: appended.added,
            skipped,
            exhausted,
        })
    }
}

impl std::fmt::Debug for PaginatedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedFetcher")
            .field("page_size", &self.page_size)
            .field("in_flight", &self.in_flight.is_held())
            .finish()
    }
}
