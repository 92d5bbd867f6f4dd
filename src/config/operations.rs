//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::default_lock_dir;
use crate::error::{Result, SemaphoreError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `lock_dir`.
pub const LOCK_DIR_ENV: &str = "SEMLOCK_LOCK_DIR";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(SemaphoreError::ConfigError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            SemaphoreError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| SemaphoreError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            SemaphoreError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `poll_interval_ms` must be positive
    /// - `stale_after_secs` must be positive
    /// - `lock_dir`, when set, must not be empty
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(SemaphoreError::ConfigError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.stale_after_secs == 0 {
            return Err(SemaphoreError::ConfigError(
                "stale_after_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(dir) = &self.lock_dir
            && dir.as_os_str().is_empty()
        {
            return Err(SemaphoreError::ConfigError(
                "lock_dir must not be empty when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using the given variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(LOCK_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.lock_dir = Some(PathBuf::from(dir));
        }
    }

    /// The lock directory to use, falling back to `<temp_dir>/semaphores`.
    pub fn resolved_lock_dir(&self) -> PathBuf {
        self.lock_dir.clone().unwrap_or_else(default_lock_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_budget(&self) -> Duration {
        Duration::from_millis(self.wait_budget_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}
