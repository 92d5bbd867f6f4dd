//! Inspecting, listing, and force-clearing lock files.

use super::{FileBackend, is_lock_file_name, read_holder};
use crate::backend::types::SemaphoreKey;
use crate::error::{Result, SemaphoreError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot of one lock file on disk.
#[derive(Debug, Clone, Serialize)]
pub struct LockFileInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The key, when known. Listing a directory cannot recover keys from
    /// hashed file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<SemaphoreKey>,

    /// Ownership code currently stored in the file (may be empty). Bytes that
    /// are not UTF-8 are shown lossily.
    pub holder: String,

    /// Last modification time of the file.
    pub modified_at: DateTime<Utc>,
}

impl LockFileInfo {
    fn read(path: &Path, key: Option<SemaphoreKey>) -> Result<Option<Self>> {
        let holder = match read_holder(path) {
            Ok(Some(content)) => String::from_utf8_lossy(&content).into_owned(),
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(SemaphoreError::UserError(format!(
                    "failed to read lock file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let modified_at = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(time) => DateTime::<Utc>::from(time),
            Err(_) => Utc::now(),
        };

        Ok(Some(Self {
            path: path.to_path_buf(),
            key,
            holder,
            modified_at,
        }))
    }

    /// Time since the lock file was last written.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.modified_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds.max(0))
        }
    }

    /// Whether the file is older than `threshold`.
    pub fn is_stale(&self, threshold: std::time::Duration) -> bool {
        let threshold = i64::try_from(threshold.as_secs()).unwrap_or(i64::MAX);
        self.age().num_seconds() > threshold
    }
}

impl std::fmt::Display for LockFileInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.key {
            Some(key) => write!(f, "key {} ", key)?,
            None => write!(f, "{} ", self.path.display())?,
        }
        let holder = if self.holder.is_empty() {
            "<empty>"
        } else {
            self.holder.as_str()
        };
        write!(f, "(holder: {}, age: {})", holder, self.age_string())
    }
}

impl FileBackend {
    /// Lock file state for `key`, or `None` when it is not held.
    pub fn inspect(&self, key: SemaphoreKey) -> Result<Option<LockFileInfo>> {
        LockFileInfo::read(&self.lock_path(key), Some(key))
    }

    /// All lock files in the lock directory, sorted by path.
    ///
    /// Files whose names do not look like lock files are skipped.
    pub fn list(&self) -> Result<Vec<LockFileInfo>> {
        let mut locks = Vec::new();

        if !self.lock_dir.exists() {
            return Ok(locks);
        }

        let entries = fs::read_dir(&self.lock_dir).map_err(|e| {
            SemaphoreError::UserError(format!(
                "failed to read lock directory '{}': {}",
                self.lock_dir.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                SemaphoreError::UserError(format!("failed to read lock directory entry: {}", e))
            })?;

            let path = entry.path();
            let is_lock = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_lock_file_name);
            if !is_lock {
                continue;
            }

            // Released between read_dir and read
            if let Some(info) = LockFileInfo::read(&path, None)? {
                locks.push(info);
            }
        }

        locks.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(locks)
    }

    /// Forcibly remove the lock file for `key`, whoever holds it.
    ///
    /// This is the manual remedy for orphaned locks. Clearing a lock whose
    /// holder is still alive breaks mutual exclusion for that key.
    pub fn clear(&self, key: SemaphoreKey) -> Result<LockFileInfo> {
        let path = self.lock_path(key);

        let info = self.inspect(key)?.ok_or_else(|| {
            SemaphoreError::UserError(format!(
                "key {} is not held (no lock file at {})",
                key,
                path.display()
            ))
        })?;

        fs::remove_file(&path).map_err(|e| {
            SemaphoreError::UserError(format!(
                "failed to clear lock file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(info)
    }
}
