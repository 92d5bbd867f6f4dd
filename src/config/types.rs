//! Configuration types and defaults for semlock.
//!
//! This module defines enums, constants, and default value functions
//! used by the Config struct.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which backend the lock manager should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Native semaphores when the host supports them, lock files otherwise.
    #[default]
    Auto,
    /// Native semaphores only; fails if the host does not support them.
    Native,
    /// Lock files only.
    Filesystem,
}

impl BackendPreference {
    /// Parse a backend preference from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "native" => Some(Self::Native),
            "filesystem" | "file" => Some(Self::Filesystem),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Filesystem => "filesystem",
        }
    }
}

/// Name of the lock directory created under the system temp dir.
pub const DEFAULT_LOCK_DIR_NAME: &str = "semaphores";

/// Default lock directory: `<temp_dir>/semaphores`.
pub fn default_lock_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_LOCK_DIR_NAME)
}

// Default value functions for serde
pub(crate) fn default_poll_interval_ms() -> u64 {
    500
}
pub(crate) fn default_wait_budget_ms() -> u64 {
    15_000
}
pub(crate) fn default_stale_after_secs() -> u64 {
    3600
}
