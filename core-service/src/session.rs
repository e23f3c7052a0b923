//! Binding the library to the host's authentication state.
//!
//! The host publishes the signed-in owner on a `watch` channel (`None` when
//! signed out). The binding task follows it:
//!
//! | Observation              | Action                               |
//! |--------------------------|--------------------------------------|
//! | first `Some(owner)`      | attach                               |
//! | `Some(other)`            | switch owner (detach, reset, attach) |
//! | `None`                   | detach and reset                     |
//! | channel closed           | detach                               |
//!
//! The task holds only a weak reference to the service and stops when the
//! service is dropped.

use std::sync::Arc;

use core_async::sync::watch;
use core_async::task::JoinHandle;
use core_library::OwnerId;
use tracing::{debug, info, warn};

use crate::service::MediaLibraryService;

impl MediaLibraryService {
    /// Follow `auth` for the lifetime of the service.
    pub fn bind_session(&self, mut auth: watch::Receiver<Option<OwnerId>>) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.child_token();

        core_async::spawn(async move {
            loop {
                let observed = auth.borrow_and_update().clone();

                match weak.upgrade() {
                    Some(inner) => {
                        MediaLibraryService { inner }
                            .apply_observation(observed)
                            .await
                    }
                    None => break,
                }

                let changed = core_async::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    changed = auth.changed() => changed,
                };

                if changed.is_err() {
                    info!("Authentication channel closed, detaching");
                    if let Some(inner) = weak.upgrade() {
                        MediaLibraryService { inner }.detach().await;
                    }
                    break;
                }
            }

            debug!("Session binding stopped");
        })
    }

    async fn apply_observation(&self, observed: Option<OwnerId>) {
        match observed {
            Some(owner) => {
                if let Err(err) = self.attach(owner).await {
                    warn!(error = %err, "Attach on sign-in failed");
                }
            }
            None => {
                if self.owner().await.is_some() {
                    self.sign_out().await;
                }
            }
        }
    }
}
