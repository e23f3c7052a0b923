//! # Core Configuration Module
//!
//! Configuration management for the media library core.
//!
//! ## Overview
//!
//! A builder constructs a `CoreConfig` holding the collaborator bridges and
//! the engine settings. Validation is fail-fast: a missing required bridge or
//! an out-of-range setting is reported at `build()` with an actionable
//! message, never later at first use.
//!
//! ## Required Dependencies
//!
//! - `RecordStore` - metadata records, pagination and the push channel
//! - `BlobStore` - media and thumbnail artifacts
//!
//! ## Optional Dependencies
//!
//! - `MediaProcessor` - export passthrough (exports fail with
//!   `CapabilityMissing` when absent)
//! - `EntitlementProvider` - premium status (absent means `NONE`)
//! - `Clock` - defaults to `SystemClock`
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .record_store(Arc::new(MyRecordStore::new()))
//!     .blob_store(Arc::new(MyBlobStore::new()))
//!     .page_size(30)
//!     .sweep_interval(Duration::from_secs(300))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;

use bridge_traits::{
    BlobStore, Clock, EntitlementProvider, MediaProcessor, RecordStore, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

/// Records requested per page when not configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page the record store is asked for.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Shortest allowed period for the background reconciliation sweep.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Main configuration for the media library core.
#[derive(Clone)]
pub struct CoreConfig {
    /// Remote metadata record collection
    pub record_store: Arc<dyn RecordStore>,

    /// Remote artifact storage
    pub blob_store: Arc<dyn BlobStore>,

    /// Export/metadata boundary service
    pub media_processor: Option<Arc<dyn MediaProcessor>>,

    /// Premium status source
    pub entitlement_provider: Option<Arc<dyn EntitlementProvider>>,

    /// Time source for ledger timestamps
    pub clock: Arc<dyn Clock>,

    /// Records requested per page
    pub page_size: u32,

    /// Broadcast buffer for the event bus
    pub event_buffer_size: usize,

    /// Period of the background reconciliation sweep, disabled when `None`
    pub sweep_interval: Option<Duration>,

    /// Logging settings applied by the service bootstrap
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("record_store", &"<RecordStore>")
            .field("blob_store", &"<BlobStore>")
            .field(
                "media_processor",
                &self.media_processor.as_ref().map(|_| "<MediaProcessor>"),
            )
            .field(
                "entitlement_provider",
                &self
                    .entitlement_provider
                    .as_ref()
                    .map(|_| "<EntitlementProvider>"),
            )
            .field("page_size", &self.page_size)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("sweep_interval", &self.sweep_interval)
            .field("logging", &self.logging)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Page size is within `1..=MAX_PAGE_SIZE`
    /// - Event buffer is non-zero
    /// - Sweep interval, when set, is at least `MIN_SWEEP_INTERVAL`
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config(
                "Page size must be greater than 0".to_string(),
            ));
        }

        if self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size {} exceeds maximum of {}",
                self.page_size, MAX_PAGE_SIZE
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if let Some(interval) = self.sweep_interval {
            if interval < MIN_SWEEP_INTERVAL {
                return Err(Error::Config(format!(
                    "Sweep interval {:?} is shorter than the minimum of {:?}. \
                     Use a longer interval or disable the periodic sweep.",
                    interval, MIN_SWEEP_INTERVAL
                )));
            }
        }

        Ok(())
    }
}

/// Builder for `CoreConfig`.
#[derive(Default)]
pub struct CoreConfigBuilder {
    record_store: Option<Arc<dyn RecordStore>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    media_processor: Option<Arc<dyn MediaProcessor>>,
    entitlement_provider: Option<Arc<dyn EntitlementProvider>>,
    clock: Option<Arc<dyn Clock>>,
    page_size: Option<u32>,
    event_buffer_size: Option<usize>,
    sweep_interval: Option<Duration>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the record store (required).
    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }

    /// Sets the blob store (required).
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    pub fn media_processor(mut self, processor: Arc<dyn MediaProcessor>) -> Self {
        self.media_processor = Some(processor);
        self
    }

    pub fn entitlement_provider(mut self, provider: Arc<dyn EntitlementProvider>) -> Self {
        self.entitlement_provider = Some(provider);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the number of records requested per page (default 20).
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables the periodic reconciliation sweep.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when the record store or blob store is absent
    /// - `Config` when a setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let record_store = self.record_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "RecordStore".to_string(),
            message: "No RecordStore implementation provided. The library cannot page, \
                      subscribe or delete metadata records without one. \
                      Use .record_store() to inject the host adapter."
                .to_string(),
        })?;

        let blob_store = self.blob_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "BlobStore".to_string(),
            message: "No BlobStore implementation provided. Media and thumbnail artifacts \
                      cannot be deleted without one. Use .blob_store() to inject the host adapter."
                .to_string(),
        })?;

        let config = CoreConfig {
            record_store,
            blob_store,
            media_processor: self.media_processor,
            entitlement_provider: self.entitlement_provider,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            sweep_interval: self.sweep_interval,
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{PageCursor, RecordPage, SnapshotStream};

    struct NullRecordStore;

    #[async_trait]
    impl RecordStore for NullRecordStore {
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
            Err(bridge_traits::BridgeError::NotAvailable("subscribe".to_string()))
        }
    }

    struct NullBlobStore;

    #[async_trait]
    impl BlobStore for NullBlobStore {
        async fn delete_blob(&self, _reference: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .record_store(Arc::new(NullRecordStore))
            .blob_store(Arc::new(NullBlobStore))
    }

    #[test]
    fn test_builder_defaults() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.sweep_interval.is_none());
        assert!(config.media_processor.is_none());
        assert!(config.entitlement_provider.is_none());
    }

    #[test]
    fn test_builder_requires_record_store() {
        let err = CoreConfig::builder()
            .blob_store(Arc::new(NullBlobStore))
            .build()
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("RecordStore"));
        assert!(msg.contains(".record_store()"));
    }

    #[test]
    fn test_builder_requires_blob_store() {
        let err = CoreConfig::builder()
            .record_store(Arc::new(NullRecordStore))
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "BlobStore"
        ));
    }

    #[test]
    fn test_page_size_bounds() {
        let err = complete_builder().page_size(0).build().unwrap_err();
        assert!(err.to_string().contains("greater than 0"));

        let err = complete_builder()
            .page_size(MAX_PAGE_SIZE + 1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));

        assert!(complete_builder().page_size(MAX_PAGE_SIZE).build().is_ok());
    }

    #[test]
    fn test_event_buffer_must_be_positive() {
        let err = complete_builder().event_buffer_size(0).build().unwrap_err();
        assert!(err.to_string().contains("Event buffer"));
    }

    #[test]
    fn test_sweep_interval_minimum() {
        let err = complete_builder()
            .sweep_interval(Duration::from_millis(10))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Sweep interval"));

        let config = complete_builder()
            .sweep_interval(Duration::from_secs(60))
            .build()
            .unwrap();
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("<RecordStore>"));
        assert!(debug.contains("page_size: 20"));
    }
}
