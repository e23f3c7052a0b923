use core_library::LibraryError;
use thiserror::Error;

use crate::deletion::DeletionStep;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Deletion of {item_id} stopped at {step}: {message}")]
    PartialDeletion {
        item_id: String,
        step: DeletionStep,
        /// Steps that already succeeded and were not rolled back
        completed: Vec<DeletionStep>,
        message: String,
    },

    #[error("Another deletion is in progress, rejected {item_id}")]
    DeletionInProgress { item_id: String },

    #[error("No owner attached")]
    NotAttached,

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
