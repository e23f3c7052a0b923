//! # Reconciliation Sweep
//!
//! Finishes deletion cascades that stopped part-way.
//!
//! The sweep walks the [`CleanupLedger`](crate::ledger::CleanupLedger) oldest
//! failure first and runs each entry's remaining steps, forward only. A store
//! answering `NotFound` counts as already deleted. Finished entries leave the
//! ledger and, if still listed, the collection.
//!
//! The sweep shares the deletion gate: while a user deletion runs, the sweep
//! skips its round. While the sweep runs, the view reports `deleting`.

use std::sync::Arc;
use std::time::Duration;

use core_async::sync::CancellationToken;
use core_async::task::JoinHandle;
use core_async::time::{interval, MissedTickBehavior};
use core_runtime::events::{CoreEvent, LibraryEvent};
use tracing::{debug, info, instrument, warn};

use crate::deletion::{remaining_from, DeletionCoordinator};
use crate::ledger::CleanupEntry;

/// Counts from one sweep round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub attempted: usize,
    pub completed: usize,
    pub still_pending: usize,
}

#[derive(Debug, Clone)]
pub struct ReconciliationSweep {
    coordinator: Arc<DeletionCoordinator>,
}

impl ReconciliationSweep {
    pub fn new(coordinator: Arc<DeletionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Run one round over the ledger.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> SweepReport {
        let ledger = self.coordinator.ledger();

        let Some(_gate) = self.coordinator.try_begin() else {
            let still_pending = ledger.len().await;
            debug!(still_pending, "Deletion in progress, skipping sweep round");
            return SweepReport {
                still_pending,
                ..SweepReport::default()
            };
        };

        // Read under the gate so a user deletion that just finished is not
        // replayed.
        let pending = ledger.pending().await;
        if pending.is_empty() {
            return SweepReport::default();
        }

        self.coordinator
            .store
            .mutate(|state| state.deleting = true)
            .await;

        let mut report = SweepReport::default();

        for entry in pending {
            report.attempted += 1;
            let item_id = entry.item.id.clone();

            match self
                .coordinator
                .run_cascade(&entry.item, &entry.remaining, true)
                .await
            {
                Ok(()) => {
                    ledger.remove(&item_id).await;
                    self.coordinator
                        .store
                        .mutate(|state| {
                            state.remove_item(&item_id);
                        })
                        .await;

                    info!(item_id = %item_id, "Pending cleanup completed");
                    self.coordinator
                        .events
                        .emit(CoreEvent::Library(LibraryEvent::CleanupCompleted {
                            item_id: item_id.to_string(),
                        }))
                        .ok();
                    report.completed += 1;
                }
                Err(failure) => {
                    warn!(
                        item_id = %item_id,
                        step = %failure.step,
                        error = %failure.error,
                        attempts = entry.attempts + 1,
                        "Pending cleanup still failing"
                    );
                    ledger
                        .record(CleanupEntry {
                            remaining: remaining_from(&entry.remaining, failure.step),
                            failed_at: self.coordinator.clock.now(),
                            last_error: failure.error.to_string(),
                            attempts: entry.attempts + 1,
                            item: entry.item,
                        })
                        .await;
                    report.still_pending += 1;
                }
            }
        }

        self.coordinator
            .store
            .mutate(|state| state.deleting = false)
            .await;

        info!(
            attempted = report.attempted,
            completed = report.completed,
            still_pending = report.still_pending,
            "Sweep finished"
        );
        report
    }

    /// Run [`reconcile`](Self::reconcile) every `period` until `token` is
    /// cancelled. The first round runs one full period after the start.
    pub fn spawn_periodic(self, period: Duration, token: CancellationToken) -> JoinHandle<()> {
        core_async::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                core_async::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.reconcile().await;
                    }
                }
            }

            debug!("Periodic sweep stopped");
        })
    }
}
