//! One-shot readiness gate shared by the workers of a batch.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::PluginError;

type Slot = Option<Result<(), String>>;

/// Single-resolution promise that build workers wait on before building.
///
/// The slot starts unset. The first call to [`HeaderBarrier::resolve`] fills
/// it and wakes every waiter; later calls are ignored. A barrier is never
/// re-armed: each batch creates a fresh one.
#[derive(Debug, Default)]
pub struct HeaderBarrier {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl HeaderBarrier {
    /// Creates an unresolved barrier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a barrier that is already released.
    #[must_use]
    pub fn resolved() -> Self {
        Self {
            slot: Mutex::new(Some(Ok(()))),
            ready: Condvar::new(),
        }
    }

    /// Stores `outcome` if the barrier is still unset and wakes all waiters.
    ///
    /// Returns `true` if this call resolved the barrier.
    pub fn resolve(&self, outcome: Result<(), String>) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        drop(slot);
        self.ready.notify_all();
        true
    }

    /// Returns the outcome without waiting, if one has been stored.
    #[must_use]
    pub fn peek(&self) -> Option<Result<(), String>> {
        self.lock().clone()
    }

    /// Blocks until the barrier is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::HeadersUnready`] if header setup failed.
    pub fn wait(&self) -> Result<(), PluginError> {
        let slot = self
            .ready
            .wait_while(self.lock(), |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(Err(message)) => Err(PluginError::HeadersUnready {
                message: message.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
