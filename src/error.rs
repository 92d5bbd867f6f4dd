//! Error types for semlock.
//!
//! Uses thiserror for derive macros. Each variant maps to a CLI exit code.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for semlock operations.
#[derive(Error, Debug)]
pub enum SemaphoreError {
    /// The lock could not be obtained: the native primitive failed, the
    /// filesystem wait budget ran out, or the lock file could not be created.
    #[error("Failed to acquire semaphore: {0}")]
    AcquireFailure(String),

    /// The lock was ours but could not be released.
    #[error("Failed to release semaphore: {0}")]
    ReleaseFailure(String),

    /// Config file could not be read, parsed, or validated.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// User provided invalid arguments or asked for something that is not there.
    #[error("{0}")]
    UserError(String),

    /// The command run under `semlock run` exited unsuccessfully.
    #[error("command exited with status {code}")]
    CommandFailed { code: i32 },
}

impl SemaphoreError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SemaphoreError::AcquireFailure(_) => exit_codes::ACQUIRE_FAILURE,
            SemaphoreError::ReleaseFailure(_) => exit_codes::RELEASE_FAILURE,
            SemaphoreError::ConfigError(_) => exit_codes::USER_ERROR,
            SemaphoreError::UserError(_) => exit_codes::USER_ERROR,
            SemaphoreError::CommandFailed { code } => *code,
        }
    }
}

/// Result type alias for semlock operations.
pub type Result<T> = std::result::Result<T, SemaphoreError>;
