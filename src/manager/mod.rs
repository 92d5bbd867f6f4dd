//! Lock manager: the entry point callers use.
//!
//! A [`SemaphoreManager`] picks a backend once at construction, hands out
//! [`SemaphoreGuard`]s from `acquire`, and keeps a registry of every lock it
//! still holds. Dropping a guard releases its lock; dropping the manager
//! releases whatever is left in the registry (guards that were leaked with
//! `std::mem::forget`, for instance).
//!
//! # Example
//!
//! ```no_run
//! use semlock::config::Config;
//! use semlock::manager::SemaphoreManager;
//!
//! let manager = SemaphoreManager::new(&Config::default())?;
//! {
//!     let _guard = manager.acquire(42)?;
//!     // exclusive section
//! }
//! # Ok::<(), semlock::error::SemaphoreError>(())
//! ```

mod guard;

#[cfg(test)]
mod tests;

use crate::backend::{Backend, BackendKind, FileBackend, NativeBackend, SemaphoreKey, Token};
use crate::config::{BackendPreference, Config};
use crate::error::{Result, SemaphoreError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

pub use guard::SemaphoreGuard;

/// A lock this manager acquired and has not yet released.
#[derive(Debug)]
struct RegistryEntry {
    key: SemaphoreKey,
    token: Token,
}

/// Owns a backend and the registry of locks acquired through it.
#[derive(Debug)]
pub struct SemaphoreManager {
    backend: Box<dyn Backend>,
    /// Held locks by acquisition serial, oldest first.
    registry: Mutex<BTreeMap<u64, RegistryEntry>>,
    next_serial: AtomicU64,
}

impl SemaphoreManager {
    /// Create a manager using the backend selected by `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let backend = select_backend(config)?;
        Ok(Self::with_backend(backend))
    }

    /// Create a manager around an already constructed backend.
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        debug!(backend = %backend.kind(), "semaphore manager ready");
        Self {
            backend,
            registry: Mutex::new(BTreeMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Block until `key` is held, returning a guard that releases it on drop.
    ///
    /// Acquiring a key this manager already holds is not re-entrant: with the
    /// filesystem backend it waits out the budget and fails, with the native
    /// backend it blocks forever.
    pub fn acquire(&self, key: impl Into<SemaphoreKey>) -> Result<SemaphoreGuard<'_>> {
        let key = key.into();
        let token = self.backend.acquire(key)?;

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        self.registry().insert(serial, RegistryEntry { key, token });

        Ok(SemaphoreGuard::new(self, key, serial))
    }

    /// Release a guard, reporting errors instead of logging them.
    ///
    /// A guard whose lock was already released (for example by
    /// [`SemaphoreManager::release_all`]) is a no-op.
    pub fn release(&self, guard: SemaphoreGuard<'_>) -> Result<()> {
        guard.release()
    }

    /// Release every lock still in the registry, newest first.
    ///
    /// Keeps going past failures so one bad entry does not strand the rest.
    /// Each failure is logged; the first one is returned once all entries have
    /// been tried. On success returns how many locks were released.
    pub fn release_all(&self) -> Result<usize> {
        let entries = std::mem::take(&mut *self.registry());

        let mut released = 0;
        let mut first_error: Option<SemaphoreError> = None;

        for (_, entry) in entries.into_iter().rev() {
            let key = entry.key;
            match self.backend.release(entry.token) {
                Ok(()) => released += 1,
                Err(e) => {
                    warn!(%key, error = %e, "failed to release semaphore during cleanup");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(released),
        }
    }

    /// Keys currently held through this manager, in acquisition order.
    pub fn held_keys(&self) -> Vec<SemaphoreKey> {
        self.registry().values().map(|entry| entry.key).collect()
    }

    pub(crate) fn is_registered(&self, serial: u64) -> bool {
        self.registry().contains_key(&serial)
    }

    /// Release the registry entry for `serial`, if it is still there.
    pub(crate) fn release_entry(&self, serial: u64) -> Result<()> {
        let entry = self.registry().remove(&serial);

        match entry {
            Some(entry) => self.backend.release(entry.token),
            None => {
                debug!(serial, "semaphore already released");
                Ok(())
            }
        }
    }

    fn registry(&self) -> MutexGuard<'_, BTreeMap<u64, RegistryEntry>> {
        self.registry
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Drop for SemaphoreManager {
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            warn!(error = %e, "semaphores left behind at shutdown");
        }
    }
}

/// Pick the backend for `config`.
///
/// - `auto`: native semaphores when supported, lock files otherwise
/// - `native`: native semaphores, error if unsupported
/// - `filesystem`: lock files
pub fn select_backend(config: &Config) -> Result<Box<dyn Backend>> {
    match config.backend {
        BackendPreference::Auto if NativeBackend::is_supported() => {
            Ok(Box::new(NativeBackend::new()?))
        }
        BackendPreference::Auto | BackendPreference::Filesystem => {
            Ok(Box::new(FileBackend::new(config)))
        }
        BackendPreference::Native => Ok(Box::new(NativeBackend::new()?)),
    }
}
