//! Non-blocking single-entry gates.
//!
//! A second caller is turned away instead of queued. A gate reopens when
//! its guard is dropped, on every exit path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Gate {
    held: AtomicBool,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter the gate, `None` when it is already held.
    pub(crate) fn try_enter(&self) -> Option<GateGuard<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard { gate: self })
    }

    pub(crate) fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

pub(crate) struct GateGuard<'a> {
    gate: &'a Gate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.held.store(false, Ordering::Release);
    }
}

/// Single-entry gate owned by a session epoch.
///
/// A caller from a newer epoch takes the gate over from a holder that
/// started in an older one. A guard only reopens the gate while its own
/// epoch still owns it.
#[derive(Debug, Default)]
pub(crate) struct EpochGate {
    /// Owner epoch plus one, zero when open.
    owner: AtomicU64,
}

impl EpochGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter for `epoch`, `None` when a caller of the same or a newer epoch
    /// holds the gate.
    pub(crate) fn try_enter(&self, epoch: u64) -> Option<EpochGuard<'_>> {
        let claim = epoch.saturating_add(1);
        let mut current = self.owner.load(Ordering::Acquire);
        loop {
            if current >= claim {
                return None;
            }
            match self
                .owner
                .compare_exchange(current, claim, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Some(EpochGuard { gate: self, claim }),
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn is_held(&self) -> bool {
        self.owner.load(Ordering::Acquire) != 0
    }
}

pub(crate) struct EpochGuard<'a> {
    gate: &'a EpochGate,
    claim: u64,
}

impl Drop for EpochGuard<'_> {
    fn drop(&mut self) {
        // Taken over by a newer epoch: the new owner releases it.
        let _ = self.gate.owner.compare_exchange(
            self.claim,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
