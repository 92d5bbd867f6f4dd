//! Tests for the lock manager and its guards.

use super::*;
use crate::test_support::{fast_config, file_manager};
use std::sync::atomic::AtomicUsize;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Filesystem backend that refuses to release one key.
#[derive(Debug)]
struct StuckReleaseBackend {
    inner: FileBackend,
    stuck: SemaphoreKey,
}

impl Backend for StuckReleaseBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn acquire(&self, key: SemaphoreKey) -> Result<Token> {
        self.inner.acquire(key)
    }

    fn release(&self, token: Token) -> Result<()> {
        if token.key() == self.stuck {
            return Err(SemaphoreError::ReleaseFailure("unlink failed".to_string()));
        }
        self.inner.release(token)
    }
}

/// Backend that grants every request and records released semaphore ids.
#[derive(Debug, Default)]
struct GrantAllBackend {
    next_id: AtomicUsize,
    released: std::sync::Mutex<Vec<i32>>,
}

impl Backend for GrantAllBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn acquire(&self, key: SemaphoreKey) -> Result<Token> {
        let sem_id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32;
        Ok(Token::Native(crate::backend::NativeToken { key, sem_id }))
    }

    fn release(&self, token: Token) -> Result<()> {
        if let Token::Native(token) = token {
            self.released.lock().unwrap().push(token.sem_id());
        }
        Ok(())
    }
}

fn lock_file_exists(manager_dir: &TempDir, key: i64) -> bool {
    let backend = FileBackend::new(&fast_config(manager_dir));
    backend.lock_path(SemaphoreKey::new(key)).exists()
}

#[test]
fn test_acquire_registers_and_guard_drop_releases() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);

    let guard = manager.acquire(42).unwrap();
    assert_eq!(guard.key(), SemaphoreKey::new(42));
    assert!(guard.is_held());
    assert_eq!(manager.held_keys(), vec![SemaphoreKey::new(42)]);
    assert!(lock_file_exists(&dir, 42));

    drop(guard);

    assert!(manager.held_keys().is_empty());
    assert!(!lock_file_exists(&dir, 42));
}

#[test]
fn test_explicit_release_through_manager() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);

    let guard = manager.acquire(5).unwrap();
    manager.release(guard).unwrap();

    assert!(manager.held_keys().is_empty());
    assert!(!lock_file_exists(&dir, 5));
}

#[test]
fn test_guard_release_after_release_all_is_noop() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);

    let guard = manager.acquire(5).unwrap();
    assert_eq!(manager.release_all().unwrap(), 1);
    assert!(!guard.is_held());

    // Second release of the same lock
    guard.release().unwrap();
    assert!(!lock_file_exists(&dir, 5));
}

#[test]
fn test_release_after_external_clear_is_noop() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);
    let backend = FileBackend::new(&fast_config(&dir));

    let guard = manager.acquire(8).unwrap();
    backend.clear(SemaphoreKey::new(8)).unwrap();

    manager.release(guard).unwrap();
    assert!(manager.held_keys().is_empty());
}

#[test]
fn test_release_after_reassignment_leaves_new_holder() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);
    let backend = FileBackend::new(&fast_config(&dir));
    let path = backend.lock_path(SemaphoreKey::new(8));

    let guard = manager.acquire(8).unwrap();
    std::fs::write(&path, "new-holder").unwrap();

    manager.release(guard).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "new-holder");
}

#[test]
fn test_leaked_guards_are_released_when_manager_drops() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);

    std::mem::forget(manager.acquire(3).unwrap());
    std::mem::forget(manager.acquire(9).unwrap());
    assert!(lock_file_exists(&dir, 3));
    assert!(lock_file_exists(&dir, 9));

    drop(manager);

    assert!(!lock_file_exists(&dir, 3));
    assert!(!lock_file_exists(&dir, 9));
}

#[test]
fn test_release_all_continues_past_failures() {
    let dir = TempDir::new().unwrap();
    let manager = SemaphoreManager::with_backend(Box::new(StuckReleaseBackend {
        inner: FileBackend::new(&fast_config(&dir)),
        stuck: SemaphoreKey::new(2),
    }));

    std::mem::forget(manager.acquire(1).unwrap());
    std::mem::forget(manager.acquire(2).unwrap());
    std::mem::forget(manager.acquire(3).unwrap());

    let err = manager.release_all().unwrap_err();
    assert!(matches!(err, SemaphoreError::ReleaseFailure(_)));

    assert!(manager.held_keys().is_empty());
    assert!(!lock_file_exists(&dir, 1));
    assert!(lock_file_exists(&dir, 2));
    assert!(!lock_file_exists(&dir, 3));
}

#[test]
fn test_release_all_on_empty_registry() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);
    assert_eq!(manager.release_all().unwrap(), 0);
}

#[test]
fn test_held_keys_in_acquisition_order() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);

    let _c = manager.acquire(30).unwrap();
    let _a = manager.acquire(10).unwrap();
    let _b = manager.acquire(20).unwrap();

    assert_eq!(
        manager.held_keys(),
        vec![
            SemaphoreKey::new(30),
            SemaphoreKey::new(10),
            SemaphoreKey::new(20)
        ]
    );
}

#[test]
fn test_timeout_surfaces_acquire_failure_and_registers_nothing() {
    let dir = TempDir::new().unwrap();
    let holder = file_manager(&dir);
    let contender = file_manager(&dir);

    let _guard = holder.acquire(7).unwrap();

    let err = contender.acquire(7).unwrap_err();
    assert!(matches!(err, SemaphoreError::AcquireFailure(_)));
    assert!(contender.held_keys().is_empty());

    // Unrelated key still free
    let other = contender.acquire(70).unwrap();
    other.release().unwrap();
}

#[test]
fn test_two_managers_exclude_each_other() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        wait_budget_ms: 5_000,
        ..fast_config(&dir)
    };
    let first = SemaphoreManager::new(&config).unwrap();
    let second = SemaphoreManager::new(&config).unwrap();
    let inside = AtomicUsize::new(0);

    let guard = first.acquire(42).unwrap();
    inside.fetch_add(1, Ordering::SeqCst);

    std::thread::scope(|s| {
        let waiter = s.spawn(|| {
            let guard = second.acquire(42).unwrap();
            let concurrent = inside.fetch_add(1, Ordering::SeqCst);
            (guard, Instant::now(), concurrent)
        });

        std::thread::sleep(Duration::from_millis(100));
        inside.fetch_sub(1, Ordering::SeqCst);
        let released_at = Instant::now();
        first.release(guard).unwrap();

        let (guard, acquired_at, concurrent) = waiter.join().unwrap();
        assert_eq!(concurrent, 0);
        assert!(acquired_at.duration_since(released_at) <= config.poll_interval() * 5);
        guard.release().unwrap();
    });
}

#[test]
fn test_filesystem_preference_selects_file_backend() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);
    assert_eq!(manager.backend_kind(), BackendKind::Filesystem);
}

#[test]
fn test_auto_preference_follows_native_support() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        backend: BackendPreference::Auto,
        ..fast_config(&dir)
    };
    let manager = SemaphoreManager::new(&config).unwrap();

    let expected = if NativeBackend::is_supported() {
        BackendKind::Native
    } else {
        BackendKind::Filesystem
    };
    assert_eq!(manager.backend_kind(), expected);
}

#[test]
fn test_native_preference_without_support_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        backend: BackendPreference::Native,
        ..fast_config(&dir)
    };

    match SemaphoreManager::new(&config) {
        Ok(manager) => {
            assert!(NativeBackend::is_supported());
            assert_eq!(manager.backend_kind(), BackendKind::Native);
        }
        Err(e) => {
            assert!(!NativeBackend::is_supported());
            assert!(matches!(e, SemaphoreError::ConfigError(_)));
        }
    }
}

#[test]
fn test_same_key_acquisitions_are_registered_separately() {
    let manager = SemaphoreManager::with_backend(Box::new(GrantAllBackend::default()));

    let first = manager.acquire(4).unwrap();
    let second = manager.acquire(4).unwrap();
    assert_eq!(
        manager.held_keys(),
        vec![SemaphoreKey::new(4), SemaphoreKey::new(4)]
    );

    first.release().unwrap();
    assert!(second.is_held());
    assert_eq!(manager.held_keys(), vec![SemaphoreKey::new(4)]);

    second.release().unwrap();
    assert!(manager.held_keys().is_empty());
}

#[test]
fn test_release_all_releases_every_token_newest_first() {
    let backend = std::sync::Arc::new(GrantAllBackend::default());
    let manager = SemaphoreManager::with_backend(Box::new(SharedGrantAll(backend.clone())));

    std::mem::forget(manager.acquire(4).unwrap());
    std::mem::forget(manager.acquire(4).unwrap());
    std::mem::forget(manager.acquire(5).unwrap());

    assert_eq!(manager.release_all().unwrap(), 3);
    assert_eq!(*backend.released.lock().unwrap(), vec![2, 1, 0]);
}

/// Shares a [`GrantAllBackend`] with the test so releases can be inspected.
#[derive(Debug)]
struct SharedGrantAll(std::sync::Arc<GrantAllBackend>);

impl Backend for SharedGrantAll {
    fn kind(&self) -> BackendKind {
        self.0.kind()
    }

    fn acquire(&self, key: SemaphoreKey) -> Result<Token> {
        self.0.acquire(key)
    }

    fn release(&self, token: Token) -> Result<()> {
        self.0.release(token)
    }
}
