//! Semaphore backends.
//!
//! A backend turns an integer key into exclusive access shared by every
//! process on the host. Two implementations exist:
//!
//! - [`NativeBackend`]: System V semaphores, where the kernel provides them.
//! - [`FileBackend`]: lock files created with exclusive-create semantics,
//!   used when native semaphores are unavailable.
//!
//! Both hand out a [`Token`] from `acquire` that must be given back to the
//! same backend's `release`.

pub mod file;
pub mod native;
mod types;

use crate::error::Result;
use std::fmt::Debug;

pub use file::{FileBackend, LockFileInfo};
pub use native::{NativeBackend, NativeSemaphoreInfo};
pub use types::{BackendKind, FileToken, NativeToken, OwnershipCode, SemaphoreKey, Token};

/// Acquire/release capability implemented by every backend.
pub trait Backend: Send + Sync + Debug {
    /// Which implementation this is.
    fn kind(&self) -> BackendKind;

    /// Block until `key` is held exclusively by the caller.
    ///
    /// Fails with `SemaphoreError::AcquireFailure` if the primitive cannot be
    /// obtained or the wait is bounded and runs out.
    fn acquire(&self, key: SemaphoreKey) -> Result<Token>;

    /// Give up a lock obtained from [`Backend::acquire`].
    ///
    /// Fails with `SemaphoreError::ReleaseFailure` when the token was not
    /// issued by this backend or the underlying release call fails.
    fn release(&self, token: Token) -> Result<()>;
}
