use crate::config::{BackendPreference, Config};
use crate::manager::SemaphoreManager;
use tempfile::TempDir;

/// Filesystem-backed config rooted in `dir` with short timings so waits and
/// timeouts stay in the sub-second range.
pub(crate) fn fast_config(dir: &TempDir) -> Config {
    Config {
        backend: BackendPreference::Filesystem,
        lock_dir: Some(dir.path().join("locks")),
        poll_interval_ms: 10,
        wait_budget_ms: 200,
        ..Config::default()
    }
}

pub(crate) fn file_manager(dir: &TempDir) -> SemaphoreManager {
    SemaphoreManager::new(&fast_config(dir)).unwrap()
}
