//! Filesystem emulation of a semaphore.
//!
//! Each key owns one lock file inside a shared lock directory. The file name is
//! the SHA-256 hex digest of the key's decimal form, so every process maps the
//! same key to the same fixed-length, filesystem-safe name.
//!
//! # Protocol
//!
//! Acquire loops until it wins or the wait budget runs out:
//!
//! 1. Generate a fresh [`OwnershipCode`].
//! 2. Create the lock file with **create_new** semantics (exclusive create).
//! 3. If creation succeeded, write the code into the (empty) file, read it
//!    back, and compare. A match means the lock is ours; a mismatch means
//!    another writer got in, so the handle is closed and the file left alone.
//! 4. Otherwise sleep for the poll interval and retry, failing with
//!    `AcquireFailure` once the elapsed wait exceeds the budget.
//!
//! Release reads the file again and deletes it only if it still holds the
//! token's code. A missing file or a foreign code is a silent no-op.
//!
//! # Filesystem requirements
//!
//! Mutual exclusion rests entirely on the filesystem making exclusive create
//! atomic across processes. The read-back comparison only catches buffered or
//! torn writes; it does not make up for a filesystem without atomic exclusive
//! create. Weakly consistent network mounts (some NFS/SMB setups) are
//! unsupported: two processes may both believe they hold a key there.
//!
//! # Orphans
//!
//! A process that dies while holding a lock leaves its file behind. Nothing
//! expires it automatically; [`FileBackend::list`] reports its age and
//! [`FileBackend::clear`] removes it by hand.

mod info;


use super::types::{BackendKind, FileToken, OwnershipCode, SemaphoreKey, Token};
use super::Backend;
use crate::config::Config;
use crate::error::{Result, SemaphoreError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

pub use info::LockFileInfo;

/// Lock-file backed semaphore.
#[derive(Debug)]
pub struct FileBackend {
    lock_dir: PathBuf,
    poll_interval: Duration,
    wait_budget: Duration,
    /// Memoized key -> lock file path.
    paths: Mutex<HashMap<SemaphoreKey, PathBuf>>,
}

impl FileBackend {
    /// Create a backend using the lock directory and timings from `config`.
    ///
    /// The directory itself is created lazily on first acquire.
    pub fn new(config: &Config) -> Self {
        Self::with_settings(
            config.resolved_lock_dir(),
            config.poll_interval(),
            config.wait_budget(),
        )
    }

    pub fn with_settings(lock_dir: PathBuf, poll_interval: Duration, wait_budget: Duration) -> Self {
        Self {
            lock_dir,
            poll_interval,
            wait_budget,
            paths: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn wait_budget(&self) -> Duration {
        self.wait_budget
    }

    /// Path of the lock file for `key`.
    pub fn lock_path(&self, key: SemaphoreKey) -> PathBuf {
        let mut paths = self
            .paths
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        paths
            .entry(key)
            .or_insert_with(|| self.lock_dir.join(lock_file_name(key)))
            .clone()
    }

    /// Acquire `key`, polling until the lock file can be claimed.
    pub fn acquire_file(&self, key: SemaphoreKey) -> Result<FileToken> {
        let path = self.lock_path(key);
        let started = Instant::now();

        loop {
            let code = OwnershipCode::generate();
            if let Some(token) = self.try_claim(key, &path, code)? {
                debug!(%key, path = %path.display(), "acquired lock file");
                return Ok(token);
            }

            thread::sleep(self.poll_interval);

            let waited = started.elapsed();
            if waited > self.wait_budget {
                return Err(SemaphoreError::AcquireFailure(format!(
                    "timeout: key {} still held after waiting {}ms (lock file '{}')",
                    key,
                    waited.as_millis(),
                    path.display()
                )));
            }
        }
    }

    /// Release a lock file if it still carries the token's code.
    pub fn release_file(&self, token: FileToken) -> Result<()> {
        let FileToken {
            key,
            code,
            path,
            file,
        } = token;

        let holder = read_holder(&path).map_err(|e| {
            SemaphoreError::ReleaseFailure(format!(
                "failed to read lock file '{}': {}",
                path.display(),
                e
            ))
        })?;

        match holder {
            None => {
                debug!(%key, "lock file already gone, nothing to release");
                Ok(())
            }
            Some(content) if code.matches(&content) => {
                drop(file);
                fs::remove_file(&path).map_err(|e| {
                    SemaphoreError::ReleaseFailure(format!(
                        "unlink failed for '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                debug!(%key, path = %path.display(), "released lock file");
                Ok(())
            }
            Some(_) => {
                debug!(%key, "lock file now belongs to another owner, leaving it");
                Ok(())
            }
        }
    }

    /// One exclusive-create attempt.
    ///
    /// Returns `Ok(None)` when the file exists or another writer's code ended
    /// up in it.
    fn try_claim(
        &self,
        key: SemaphoreKey,
        path: &Path,
        code: OwnershipCode,
    ) -> Result<Option<FileToken>> {
        self.ensure_lock_dir()?;

        let mut file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => {
                return Err(SemaphoreError::AcquireFailure(format!(
                    "failed to create lock file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        match write_and_verify(&mut file, path, &code) {
            Ok(true) => Ok(Some(FileToken {
                key,
                code,
                path: path.to_path_buf(),
                file,
            })),
            Ok(false) => {
                debug!(%key, "lock file content changed under us, backing off");
                Ok(None)
            }
            Err(e) => {
                drop(file);
                // Clean up the lock file we created
                let _ = fs::remove_file(path);
                Err(SemaphoreError::AcquireFailure(format!(
                    "failed to write lock file '{}': {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    fn ensure_lock_dir(&self) -> Result<()> {
        if self.lock_dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.lock_dir).map_err(|e| {
            SemaphoreError::AcquireFailure(format!(
                "failed to create lock directory '{}': {}",
                self.lock_dir.display(),
                e
            ))
        })
    }
}

impl Backend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    fn acquire(&self, key: SemaphoreKey) -> Result<Token> {
        self.acquire_file(key).map(Token::File)
    }

    fn release(&self, token: Token) -> Result<()> {
        match token {
            Token::File(token) => self.release_file(token),
            other => Err(SemaphoreError::ReleaseFailure(format!(
                "token for key {} was issued by the {} backend",
                other.key(),
                other.kind()
            ))),
        }
    }
}

/// Lock file name for `key`: SHA-256 hex of its decimal representation.
pub fn lock_file_name(key: SemaphoreKey) -> String {
    let digest = Sha256::digest(key.to_string().as_bytes());
    hex::encode(digest)
}

/// Whether `name` looks like a name produced by [`lock_file_name`].
pub(crate) fn is_lock_file_name(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Raw lock file content, or `None` if the file does not exist.
///
/// Content that is not valid UTF-8 is returned as-is and simply never matches
/// an ownership code.
pub(crate) fn read_holder(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write `code` into a freshly created, still-empty lock file and confirm it
/// is what the file holds afterwards.
fn write_and_verify(file: &mut File, path: &Path, code: &OwnershipCode) -> io::Result<bool> {
    match read_holder(path)? {
        Some(content) if content.is_empty() => {
            file.write_all(code.as_str().as_bytes())?;
            file.sync_all()?;
        }
        Some(_) => {}
        None => return Ok(false),
    }

    Ok(read_holder(path)?.is_some_and(|content| code.matches(&content)))
}
