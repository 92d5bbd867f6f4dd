//! RAII semaphore guard implementation.

use super::SemaphoreManager;
use crate::backend::SemaphoreKey;
use crate::error::Result;
use tracing::warn;

/// RAII guard for a held semaphore.
///
/// When dropped, the semaphore is released through the manager that issued
/// it. If release fails, a warning is logged but no panic occurs.
#[derive(Debug)]
#[must_use = "dropping the guard releases the semaphore immediately"]
pub struct SemaphoreGuard<'a> {
    manager: &'a SemaphoreManager,

    key: SemaphoreKey,

    /// Registry entry this guard owns.
    serial: u64,

    /// Whether the guard has been released manually.
    released: bool,
}

impl<'a> SemaphoreGuard<'a> {
    pub(super) fn new(manager: &'a SemaphoreManager, key: SemaphoreKey, serial: u64) -> Self {
        Self {
            manager,
            key,
            serial,
            released: false,
        }
    }

    pub fn key(&self) -> SemaphoreKey {
        self.key
    }

    /// Whether the manager still holds this guard's lock.
    ///
    /// `false` after [`SemaphoreManager::release_all`] has run.
    pub fn is_held(&self) -> bool {
        !self.released && self.manager.is_registered(self.serial)
    }

    /// Manually release the semaphore.
    ///
    /// This is useful when you want to release before the guard goes out of
    /// scope and handle errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.manager.release_entry(self.serial)
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.manager.release_entry(self.serial)
        {
            warn!(key = %self.key, error = %e, "failed to release semaphore");
        }
    }
}
