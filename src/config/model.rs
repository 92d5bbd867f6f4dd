//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the semaphore manager and its backends.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Backend selection
    // =========================================================================
    /// Which backend to use (`auto`, `native`, `filesystem`).
    #[serde(default)]
    pub backend: BackendPreference,

    // =========================================================================
    // Filesystem backend settings
    // =========================================================================
    /// Directory holding lock files. Defaults to `<temp_dir>/semaphores`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_dir: Option<PathBuf>,

    /// How often a waiting acquire re-checks the lock file.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum time an acquire waits before failing.
    #[serde(default = "default_wait_budget_ms")]
    pub wait_budget_ms: u64,

    /// Age after which `status` reports a lock file as stale.
    /// Reporting only: stale locks are never removed automatically.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            lock_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
            wait_budget_ms: default_wait_budget_ms(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}
