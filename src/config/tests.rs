//! Tests for config functionality.

use crate::config::types::default_lock_dir;
use crate::config::{BackendPreference, Config, LOCK_DIR_ENV};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.backend, BackendPreference::Auto);
    assert!(config.lock_dir.is_none());
    assert_eq!(config.poll_interval_ms, 500);
    assert_eq!(config.wait_budget_ms, 15_000);
    assert_eq!(config.stale_after_secs, 3600);
    assert_eq!(config.poll_interval(), Duration::from_millis(500));
    assert_eq!(config.wait_budget(), Duration::from_secs(15));
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    // Should use all defaults
    assert_eq!(config.backend, BackendPreference::Auto);
    assert_eq!(config.wait_budget_ms, 15_000);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
backend: filesystem
lock_dir: /var/tmp/my-locks
poll_interval_ms: 50
wait_budget_ms: 2000
stale_after_secs: 60
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.backend, BackendPreference::Filesystem);
    assert_eq!(config.lock_dir, Some(PathBuf::from("/var/tmp/my-locks")));
    assert_eq!(config.poll_interval(), Duration::from_millis(50));
    assert_eq!(config.wait_budget(), Duration::from_secs(2));
    assert_eq!(config.stale_after(), Duration::from_secs(60));
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
backend: native
future_option: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.backend, BackendPreference::Native);
}

#[test]
fn test_invalid_backend_is_rejected() {
    let err = Config::from_yaml("backend: carrier_pigeon").unwrap_err();
    assert!(err.to_string().contains("failed to parse config YAML"));
}

#[test]
fn test_zero_poll_interval_fails_validation() {
    let err = Config::from_yaml("poll_interval_ms: 0").unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn test_zero_stale_after_fails_validation() {
    let err = Config::from_yaml("stale_after_secs: 0").unwrap_err();
    assert!(err.to_string().contains("stale_after_secs"));
}

#[test]
fn test_zero_wait_budget_is_allowed() {
    let config = Config::from_yaml("wait_budget_ms: 0").unwrap();
    assert_eq!(config.wait_budget(), Duration::ZERO);
}

#[test]
fn test_empty_lock_dir_fails_validation() {
    let err = Config::from_yaml("lock_dir: \"\"").unwrap_err();
    assert!(err.to_string().contains("lock_dir"));
}

#[test]
fn test_resolved_lock_dir_falls_back_to_temp() {
    let config = Config::default();
    assert_eq!(config.resolved_lock_dir(), default_lock_dir());
    assert!(config.resolved_lock_dir().ends_with("semaphores"));
}

#[test]
fn test_env_override_sets_lock_dir() {
    let mut config = Config::default();
    config.apply_overrides_from(|name| {
        (name == LOCK_DIR_ENV).then(|| "/tmp/override-locks".to_string())
    });
    assert_eq!(config.resolved_lock_dir(), PathBuf::from("/tmp/override-locks"));
}

#[test]
fn test_empty_env_override_is_ignored() {
    let mut config = Config {
        lock_dir: Some(PathBuf::from("/from/file")),
        ..Config::default()
    };
    config.apply_overrides_from(|_| Some("  ".to_string()));
    assert_eq!(config.lock_dir, Some(PathBuf::from("/from/file")));
}

#[test]
fn test_yaml_roundtrip_preserves_values() {
    let config = Config {
        backend: BackendPreference::Filesystem,
        lock_dir: Some(PathBuf::from("/tmp/x")),
        poll_interval_ms: 25,
        wait_budget_ms: 100,
        stale_after_secs: 10,
    };
    let parsed = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();
    assert_eq!(parsed.backend, BackendPreference::Filesystem);
    assert_eq!(parsed.lock_dir, config.lock_dir);
    assert_eq!(parsed.poll_interval_ms, 25);
    assert_eq!(parsed.wait_budget_ms, 100);
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("semlock.yaml");
    std::fs::write(&path, "backend: filesystem\nwait_budget_ms: 750\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.backend, BackendPreference::Filesystem);
    assert_eq!(config.wait_budget_ms, 750);
}

#[test]
fn test_load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(dir.path().join("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_backend_preference_from_str() {
    assert_eq!(BackendPreference::from_str("auto"), Some(BackendPreference::Auto));
    assert_eq!(BackendPreference::from_str("native"), Some(BackendPreference::Native));
    assert_eq!(
        BackendPreference::from_str("filesystem"),
        Some(BackendPreference::Filesystem)
    );
    assert_eq!(BackendPreference::from_str("file"), Some(BackendPreference::Filesystem));
    assert_eq!(BackendPreference::from_str("sysv"), None);
}
