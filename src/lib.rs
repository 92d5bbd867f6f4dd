//! Semlock: mutual exclusion between processes on one host, keyed by integers.
//!
//! Locks are provided by System V semaphores when the host supports them and
//! by lock files in a shared directory otherwise. Callers go through
//! [`manager::SemaphoreManager`], which returns guards that release on drop.

pub mod backend;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod manager;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{Backend, BackendKind, FileBackend, NativeBackend, OwnershipCode, SemaphoreKey};
pub use config::Config;
pub use error::{Result, SemaphoreError};
pub use manager::{SemaphoreGuard, SemaphoreManager};
