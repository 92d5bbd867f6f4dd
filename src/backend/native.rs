//! System V semaphore backend.
//!
//! Each key names a one-element SysV semaphore set. The semaphore value is 0
//! when free and 1 when held. Acquire is a single atomic `semop` that waits for
//! zero and then increments; release decrements. Both use `SEM_UNDO`, so the
//! kernel gives the semaphore back if the holder dies.
//!
//! Only Linux is supported. Elsewhere [`NativeBackend::is_supported`] is
//! `false` and the manager falls back to lock files.

use super::Backend;
use super::types::{BackendKind, NativeToken, SemaphoreKey, Token};
use crate::error::{Result, SemaphoreError};
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

/// Native semaphore backend.
#[derive(Debug)]
pub struct NativeBackend {
    _private: (),
}

/// Kernel-side state of a native semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NativeSemaphoreInfo {
    pub sem_id: i32,
    pub held: bool,
    /// PID of the last process to operate on the semaphore.
    pub last_pid: i32,
}

impl NativeBackend {
    /// Whether the host exposes usable SysV semaphores.
    ///
    /// Probed once per process and cached.
    pub fn is_supported() -> bool {
        static SUPPORTED: OnceLock<bool> = OnceLock::new();
        *SUPPORTED.get_or_init(sys::probe)
    }

    /// Create the backend, failing if native semaphores are unavailable.
    pub fn new() -> Result<Self> {
        if !Self::is_supported() {
            return Err(SemaphoreError::ConfigError(
                "native semaphores are not available on this host".to_string(),
            ));
        }
        Ok(Self { _private: () })
    }

    /// Block until the semaphore for `key` is held.
    pub fn acquire_native(&self, key: SemaphoreKey) -> Result<NativeToken> {
        let native_key = to_native_key(key)?;

        let sem_id = sys::get(native_key).map_err(|e| {
            SemaphoreError::AcquireFailure(format!(
                "failed to get semaphore id for key {}: {}",
                key, e
            ))
        })?;

        sys::lock(sem_id).map_err(|e| {
            SemaphoreError::AcquireFailure(format!("failed to lock semaphore for key {}: {}", key, e))
        })?;

        debug!(%key, sem_id, "acquired native semaphore");
        Ok(NativeToken { key, sem_id })
    }

    pub fn release_native(&self, token: NativeToken) -> Result<()> {
        sys::unlock(token.sem_id).map_err(|e| {
            SemaphoreError::ReleaseFailure(format!(
                "failed to release semaphore for key {}: {}",
                token.key, e
            ))
        })?;

        debug!(key = %token.key, sem_id = token.sem_id, "released native semaphore");
        Ok(())
    }

    /// State of the semaphore for `key`, or `None` if no set exists for it.
    pub fn inspect(&self, key: SemaphoreKey) -> Result<Option<NativeSemaphoreInfo>> {
        let native_key = to_native_key(key).map_err(into_user_error)?;

        let Some(sem_id) = sys::find(native_key).map_err(|e| {
            SemaphoreError::UserError(format!("failed to look up semaphore for key {}: {}", key, e))
        })?
        else {
            return Ok(None);
        };

        let (value, last_pid) = sys::stat(sem_id).map_err(|e| {
            SemaphoreError::UserError(format!("failed to read semaphore for key {}: {}", key, e))
        })?;

        Ok(Some(NativeSemaphoreInfo {
            sem_id,
            held: value > 0,
            last_pid,
        }))
    }

    /// Remove the semaphore set for `key` from the kernel.
    ///
    /// Any process blocked on it wakes up with an error.
    pub fn remove(&self, key: SemaphoreKey) -> Result<NativeSemaphoreInfo> {
        let info = self.inspect(key)?.ok_or_else(|| {
            SemaphoreError::UserError(format!("no native semaphore exists for key {}", key))
        })?;

        sys::remove(info.sem_id).map_err(|e| {
            SemaphoreError::UserError(format!("failed to remove semaphore for key {}: {}", key, e))
        })?;

        Ok(info)
    }
}

impl Backend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn acquire(&self, key: SemaphoreKey) -> Result<Token> {
        self.acquire_native(key).map(Token::Native)
    }

    fn release(&self, token: Token) -> Result<()> {
        match token {
            Token::Native(token) => self.release_native(token),
            other => Err(SemaphoreError::ReleaseFailure(format!(
                "token for key {} was issued by the {} backend",
                other.key(),
                other.kind()
            ))),
        }
    }
}

/// SysV keys are 32-bit, and 0 is `IPC_PRIVATE`, which would give every
/// caller its own unshared set.
fn to_native_key(key: SemaphoreKey) -> Result<i32> {
    let value = i32::try_from(key.value()).map_err(|_| {
        SemaphoreError::AcquireFailure(format!(
            "key {} does not fit in a 32-bit SysV semaphore key",
            key
        ))
    })?;

    if value == 0 {
        return Err(SemaphoreError::AcquireFailure(
            "key 0 is reserved (IPC_PRIVATE) for native semaphores".to_string(),
        ));
    }

    Ok(value)
}

fn into_user_error(err: SemaphoreError) -> SemaphoreError {
    match err {
        SemaphoreError::AcquireFailure(msg) => SemaphoreError::UserError(msg),
        other => other,
    }
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
mod sys {
    use libc::{c_int, c_short, sembuf};
    use std::io;

    fn check(rc: c_int) -> io::Result<c_int> {
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc)
        }
    }

    pub(super) fn probe() -> bool {
        // SAFETY: semget takes plain integer arguments; IPC_PRIVATE always
        // creates a new set that nothing else references.
        let id = unsafe { libc::semget(libc::IPC_PRIVATE, 1, libc::IPC_CREAT | 0o600) };
        if id < 0 {
            return false;
        }
        // SAFETY: `id` was just returned by semget and IPC_RMID takes no
        // further arguments.
        unsafe { libc::semctl(id, 0, libc::IPC_RMID) };
        true
    }

    pub(super) fn get(key: libc::key_t) -> io::Result<c_int> {
        // SAFETY: plain integer arguments; a new set starts with value 0.
        check(unsafe { libc::semget(key, 1, libc::IPC_CREAT | 0o666) })
    }

    pub(super) fn find(key: libc::key_t) -> io::Result<Option<c_int>> {
        // SAFETY: plain integer arguments; no creation flag.
        match check(unsafe { libc::semget(key, 0, 0) }) {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(super) fn lock(id: c_int) -> io::Result<()> {
        let mut ops = [
            // Wait until free
            sembuf {
                sem_num: 0,
                sem_op: 0,
                sem_flg: 0,
            },
            // Then take it
            sembuf {
                sem_num: 0,
                sem_op: 1,
                sem_flg: libc::SEM_UNDO as c_short,
            },
        ];

        loop {
            // SAFETY: `ops` is a live array of `ops.len()` sembuf values for
            // the duration of the call.
            let rc = unsafe { libc::semop(id, ops.as_mut_ptr(), ops.len()) };
            match check(rc) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub(super) fn unlock(id: c_int) -> io::Result<()> {
        let mut op = sembuf {
            sem_num: 0,
            sem_op: -1,
            sem_flg: (libc::SEM_UNDO | libc::IPC_NOWAIT) as c_short,
        };
        // SAFETY: `op` is a single live sembuf for the duration of the call.
        check(unsafe { libc::semop(id, &mut op, 1) }).map(|_| ())
    }

    pub(super) fn stat(id: c_int) -> io::Result<(c_int, c_int)> {
        // SAFETY: GETVAL and GETPID take no further arguments.
        let value = check(unsafe { libc::semctl(id, 0, libc::GETVAL) })?;
        // SAFETY: as above.
        let pid = check(unsafe { libc::semctl(id, 0, libc::GETPID) })?;
        Ok((value, pid))
    }

    pub(super) fn remove(id: c_int) -> io::Result<()> {
        // SAFETY: IPC_RMID takes no further arguments.
        check(unsafe { libc::semctl(id, 0, libc::IPC_RMID) }).map(|_| ())
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use std::io;

    fn unsupported() -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "SysV semaphores are not supported on this platform",
        )
    }

    pub(super) fn probe() -> bool {
        false
    }

    pub(super) fn get(_key: i32) -> io::Result<i32> {
        Err(unsupported())
    }

    pub(super) fn find(_key: i32) -> io::Result<Option<i32>> {
        Err(unsupported())
    }

    pub(super) fn lock(_id: i32) -> io::Result<()> {
        Err(unsupported())
    }

    pub(super) fn unlock(_id: i32) -> io::Result<()> {
        Err(unsupported())
    }

    pub(super) fn stat(_id: i32) -> io::Result<(i32, i32)> {
        Err(unsupported())
    }

    pub(super) fn remove(_id: i32) -> io::Result<()> {
        Err(unsupported())
    }
}
