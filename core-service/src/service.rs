use std::sync::Arc;

use bridge_traits::{EntitlementStatus, ExportParams, MediaMetadata};
use core_async::sync::{watch, CancellationToken, Mutex};
use core_library::{LibraryView, MediaItem, OwnerId};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent};
use core_runtime::logging::{init_logging, strip_ref};
use core_sync::{
    ChangeSubscription, CleanupLedger, DeletionCoordinator, FetchOutcome, LibraryStore,
    PaginatedFetcher, ReconciliationSweep, SweepReport, SyncError,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{CoreError, Result};

pub(crate) struct ServiceInner {
    pub(crate) config: CoreConfig,
    pub(crate) events: EventBus,
    pub(crate) store: Arc<LibraryStore>,
    fetcher: PaginatedFetcher,
    subscription: ChangeSubscription,
    deletion: Arc<DeletionCoordinator>,
    sweep: ReconciliationSweep,
    /// Attached owner. Held across session transitions to serialize them.
    owner: Mutex<Option<OwnerId>>,
    pub(crate) shutdown: CancellationToken,
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Façade the UI layer talks to.
///
/// Cloning is cheap and clones share one engine. The engine (and its push
/// subscription and background tasks) is released when the last clone is
/// dropped.
#[derive(Clone)]
pub struct MediaLibraryService {
    pub(crate) inner: Arc<ServiceInner>,
}

impl MediaLibraryService {
    /// Create the engine from a validated configuration.
    ///
    /// When `sweep_interval` is set the periodic reconciliation sweep is
    /// started, which requires a running async runtime.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let store = Arc::new(LibraryStore::new());
        let ledger = Arc::new(CleanupLedger::new());

        let fetcher = PaginatedFetcher::new(
            Arc::clone(&config.record_store),
            Arc::clone(&store),
            events.clone(),
            config.page_size,
        );
        let subscription = ChangeSubscription::new(
            Arc::clone(&config.record_store),
            Arc::clone(&store),
            events.clone(),
        );
        let deletion = Arc::new(DeletionCoordinator::new(
            Arc::clone(&config.record_store),
            Arc::clone(&config.blob_store),
            Arc::clone(&store),
            ledger,
            events.clone(),
            Arc::clone(&config.clock),
        ));
        let sweep = ReconciliationSweep::new(Arc::clone(&deletion));
        let shutdown = CancellationToken::new();

        if let Some(period) = config.sweep_interval {
            if !core_async::runtime::in_runtime() {
                return Err(CoreError::InitializationFailed(
                    "The periodic reconciliation sweep needs a running async runtime. \
                     Create the service inside the runtime or leave sweep_interval unset."
                        .to_string(),
                ));
            }
            sweep.clone().spawn_periodic(period, shutdown.child_token());
            debug!(?period, "Periodic reconciliation sweep started");
        }

        info!(page_size = config.page_size, "Media library service created");

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                events,
                store,
                fetcher,
                subscription,
                deletion,
                sweep,
                owner: Mutex::new(None),
                shutdown,
            }),
        })
    }

    /// Install the global logging subscriber from `config.logging`, then
    /// create the service.
    pub fn bootstrap(config: CoreConfig) -> Result<Self> {
        init_logging(config.logging.clone())?;
        Self::new(config)
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Attach to `owner` and start receiving remote changes.
    ///
    /// Attaching the owner that is already attached only re-acquires the
    /// push channel if it has stopped. Attaching a different owner first
    /// detaches and clears the previous owner's session.
    ///
    /// # Errors
    ///
    /// `SyncError::Subscription` when the push channel cannot be opened.
    /// The owner stays attached, so pages can still be loaded.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn attach(&self, owner: OwnerId) -> Result<()> {
        let mut current = self.inner.owner.lock().await;

        if let Some(previous) = current.as_ref() {
            if *previous != owner {
                info!(previous_owner = %previous, "Switching owner");
                self.inner.subscription.unsubscribe().await;
                self.reset_store().await;
            }
        }

        *current = Some(owner.clone());

        if let Err(err) = self.inner.subscription.subscribe(&owner).await {
            warn!(error = %err, "Attached without live updates");
            return Err(err.into());
        }

        Ok(())
    }

    /// Release the push channel. The collection is kept.
    ///
    /// Returns the owner that was attached.
    #[instrument(skip(self))]
    pub async fn detach(&self) -> Option<OwnerId> {
        let mut current = self.inner.owner.lock().await;
        self.inner.subscription.unsubscribe().await;
        current.take()
    }

    /// Detach and clear the session, as on sign-out.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let mut current = self.inner.owner.lock().await;
        self.inner.subscription.unsubscribe().await;
        if let Some(owner) = current.take() {
            info!(owner_id = %owner, "Signed out");
        }
        self.reset_store().await;
    }

    /// Clear the cursor and the collection.
    ///
    /// An attached owner stays attached: its push channel is re-acquired in
    /// the new session, so the next snapshot and page load start from
    /// scratch.
    #[instrument(skip(self))]
    pub async fn reset_session(&self) -> Result<()> {
        let current = self.inner.owner.lock().await;
        self.inner.subscription.unsubscribe().await;
        self.reset_store().await;

        if let Some(owner) = current.as_ref() {
            self.inner.subscription.subscribe(owner).await?;
        }

        Ok(())
    }

    async fn reset_store(&self) {
        let epoch = self.inner.store.reset().await;
        debug!(epoch, "Session reset");
        self.inner
            .events
            .emit(CoreEvent::Session(SessionEvent::Reset))
            .ok();
    }

    pub async fn owner(&self) -> Option<OwnerId> {
        self.inner.owner.lock().await.clone()
    }

    // ------------------------------------------------------------------
    // Library operations
    // ------------------------------------------------------------------

    /// Load the next page for the attached owner.
    ///
    /// # Errors
    ///
    /// - `SyncError::NotAttached` without an attached owner
    /// - `SyncError::Fetch` when the page query fails
    pub async fn load_next_page(&self) -> Result<FetchOutcome> {
        let owner = self
            .owner()
            .await
            .ok_or(CoreError::Sync(SyncError::NotAttached))?;
        Ok(self.inner.fetcher.fetch_next_page(&owner).await?)
    }

    /// Run the deletion cascade for `item`.
    ///
    /// See [`DeletionCoordinator::delete_item`] for the failure semantics.
    pub async fn delete_item(&self, item: &MediaItem) -> Result<()> {
        Ok(self.inner.deletion.delete_item(item).await?)
    }

    /// Run one reconciliation sweep over interrupted deletions now.
    pub async fn reconcile(&self) -> SweepReport {
        self.inner.sweep.reconcile().await
    }

    /// Receiver for the library view, updated after every mutation.
    pub fn state(&self) -> watch::Receiver<LibraryView> {
        self.inner.store.subscribe()
    }

    /// Current library view.
    pub fn view(&self) -> LibraryView {
        self.inner.store.view()
    }

    /// Acknowledge the surfaced error.
    pub async fn clear_error(&self) {
        self.inner.store.clear_error().await
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    // ------------------------------------------------------------------
    // Entitlement-gated media processing
    // ------------------------------------------------------------------

    /// Current entitlement, `NONE` without a provider.
    pub fn entitlement(&self) -> EntitlementStatus {
        self.inner
            .config
            .entitlement_provider
            .as_ref()
            .map(|provider| provider.status())
            .unwrap_or_default()
    }

    /// Fail with `EntitlementRequired` unless the user is premium.
    pub fn require_premium(&self, feature: &str) -> Result<()> {
        let status = self.entitlement();
        if status.is_premium() {
            Ok(())
        } else {
            Err(CoreError::EntitlementRequired {
                feature: feature.to_string(),
                status: status.to_string(),
            })
        }
    }

    /// Export `input_ref` through the media processor.
    ///
    /// Non-premium users always get the watermark, whatever `params` asks.
    #[instrument(skip(self, input_ref, params), fields(input = %strip_ref(input_ref)))]
    pub async fn export_media(&self, input_ref: &str, mut params: ExportParams) -> Result<String> {
        let processor = self
            .inner
            .config
            .media_processor
            .as_ref()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "MediaProcessor".to_string(),
                message: "No MediaProcessor configured, exports are unavailable. \
                          Use .media_processor() on the config builder."
                    .to_string(),
            })?;

        let status = self.entitlement();
        if !status.is_premium() && !params.watermark {
            debug!(%status, "Forcing watermark for non-premium export");
            params.watermark = true;
        }

        let output = processor.export(input_ref, &params).await?;
        info!(output = %strip_ref(&output), watermark = params.watermark, "Export finished");
        Ok(output)
    }

    /// Technical metadata of an artifact, `None` when it cannot be probed.
    pub async fn media_metadata(&self, reference: &str) -> Result<Option<MediaMetadata>> {
        let processor = self
            .inner
            .config
            .media_processor
            .as_ref()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "MediaProcessor".to_string(),
                message: "No MediaProcessor configured, metadata probing is unavailable."
                    .to_string(),
            })?;

        Ok(processor.get_metadata(reference).await?)
    }
}

impl std::fmt::Debug for MediaLibraryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLibraryService")
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}
