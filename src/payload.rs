//! The single update path for IU payloads.

use std::sync::{PoisonError, RwLock};

use tokio::sync::watch;

#[derive(Debug)]
struct Slot<P> {
    value: Option<P>,
    revision: u64,
}

/// Interior-mutable payload slot shared by every IU variant.
///
/// A write swaps the whole value and bumps the revision under one lock, so a reader sees either
/// the old payload or the new one. Revision `0` means no payload has been set yet.
#[derive(Debug)]
pub struct PayloadCell<P> {
    slot: RwLock<Slot<P>>,
    revisions: watch::Sender<u64>,
}

impl<P: Clone> PayloadCell<P> {
    pub fn empty() -> Self {
        let (revisions, _) = watch::channel(0);
        Self {
            slot: RwLock::new(Slot {
                value: None,
                revision: 0,
            }),
            revisions,
        }
    }

    /// Replaces the payload and returns the new revision.
    pub fn replace(&self, value: P) -> u64 {
        // Writes never leave a partial slot behind, so a poisoned lock is still consistent.
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.value = Some(value);
        slot.revision += 1;
        // Published under the write guard so concurrent writers cannot reorder notifications.
        self.revisions.send_replace(slot.revision);
        slot.revision
    }

    pub fn get(&self) -> Option<P> {
        self.read(|value| value.cloned())
    }

    /// Runs `f` against the current payload without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(Option<&P>) -> R) -> R {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        f(slot.value.as_ref())
    }

    /// Payload and revision taken from the same read.
    pub fn snapshot(&self) -> (Option<P>, u64) {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        (slot.value.clone(), slot.revision)
    }

    pub fn revision(&self) -> u64 {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }

    /// Receiver that observes every revision published after this call.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revisions.subscribe()
    }
}
