//! Key, ownership code, and token types shared by both backends.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Integer identifying a logical resource shared between processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SemaphoreKey(i64);

impl SemaphoreKey {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for SemaphoreKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<i32> for SemaphoreKey {
    fn from(value: i32) -> Self {
        Self(i64::from(value))
    }
}

impl fmt::Display for SemaphoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SemaphoreKey {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Per-acquisition code proving which call is entitled to release a lock file.
///
/// Built from the current time in microseconds and a random `u64`. Two codes
/// colliding is possible in principle and accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnershipCode(String);

impl OwnershipCode {
    /// Generate a fresh code.
    pub fn generate() -> Self {
        let micros = Utc::now().timestamp_micros();
        let salt: u64 = rand::random();
        Self(format!("{}.{}", micros, salt))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the given lock file content names this code as holder.
    pub fn matches(&self, content: &[u8]) -> bool {
        self.0.as_bytes() == content
    }
}

impl fmt::Display for OwnershipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which backend implementation is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Native,
    Filesystem,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Filesystem => "filesystem",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof of a successful acquire, handed back to the issuing backend on release.
#[derive(Debug)]
pub enum Token {
    Native(NativeToken),
    File(FileToken),
}

impl Token {
    pub fn key(&self) -> SemaphoreKey {
        match self {
            Token::Native(token) => token.key,
            Token::File(token) => token.key,
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Token::Native(_) => BackendKind::Native,
            Token::File(_) => BackendKind::Filesystem,
        }
    }
}

/// Token for a held SysV semaphore.
#[derive(Debug)]
pub struct NativeToken {
    pub(crate) key: SemaphoreKey,
    pub(crate) sem_id: i32,
}

impl NativeToken {
    pub fn sem_id(&self) -> i32 {
        self.sem_id
    }
}

/// Token for a held lock file.
///
/// Keeps the handle from the exclusive create open until release.
#[derive(Debug)]
pub struct FileToken {
    pub(crate) key: SemaphoreKey,
    pub(crate) code: OwnershipCode,
    pub(crate) path: PathBuf,
    pub(crate) file: File,
}

impl FileToken {
    pub fn code(&self) -> &OwnershipCode {
        &self.code
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
