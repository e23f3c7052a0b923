//! # Event Bus System
//!
//! Typed events broadcast from the engine to the UI layer over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps per-domain enums (`SessionEvent`,
//!   `LibraryEvent`)
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! The UI usually renders from the `LibraryView` watch channel and uses these
//! events only for transient notifications ("item deleted", "couldn't load").
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! let event_bus = EventBus::new(16);
//! let mut rx = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Library(LibraryEvent::ItemDeleted {
//!         item_id: "rec-1".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(rx.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: the bus was dropped; treat as shutdown.
//!
//! Emitting with zero subscribers returns `Err`; publishers ignore it with
//! `.ok()`.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session lifecycle events
    Session(SessionEvent),
    /// Library collection events
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Library(LibraryEvent::FetchFailed { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::DeletionFailed { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::SubscriptionFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Library(LibraryEvent::ItemDeleted { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::CleanupCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Session(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Subscription lifecycle for the signed-in owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// Push channel acquired for an owner.
    Attached { owner_id: String },
    /// Push channel released.
    Detached { owner_id: String },
    /// Cursor and collection cleared.
    Reset,
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Attached { .. } => "Library attached to owner",
            SessionEvent::Detached { .. } => "Library detached from owner",
            SessionEvent::Reset => "Library session reset",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Changes to the in-memory media collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A page was fetched and appended.
    PageLoaded {
        /// Items appended to the collection.
        added: usize,
        /// Items dropped because their id was already present.
        skipped: usize,
        /// The record store has no further pages.
        exhausted: bool,
    },
    /// A fetch returned no records.
    PageEmpty,
    /// A page query failed.
    FetchFailed { message: String },
    /// A pushed snapshot was merged.
    SnapshotMerged {
        inserted: usize,
        updated: usize,
        removed: usize,
    },
    /// The push channel reported an error. Not shown to the user.
    SubscriptionFailed { message: String },
    /// An item's cascade completed and it left the collection.
    ItemDeleted { item_id: String },
    /// A cascade step failed; later steps were not attempted.
    DeletionFailed {
        item_id: String,
        step: String,
        message: String,
    },
    /// The reconciliation sweep finished a previously failed cascade.
    CleanupCompleted { item_id: String },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::PageLoaded { .. } => "Page loaded",
            LibraryEvent::PageEmpty => "No more items",
            LibraryEvent::FetchFailed { .. } => "Failed to load items",
            LibraryEvent::SnapshotMerged { .. } => "Remote changes merged",
            LibraryEvent::SubscriptionFailed { .. } => "Live updates interrupted",
            LibraryEvent::ItemDeleted { .. } => "Item deleted",
            LibraryEvent::DeletionFailed { .. } => "Failed to delete item",
            LibraryEvent::CleanupCompleted { .. } => "Pending cleanup completed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Cloning is cheap; clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::new(16);
/// let errors = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once the bus is dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Receives a matching event without waiting, `None` if none is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
