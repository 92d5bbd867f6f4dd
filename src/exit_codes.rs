//! Exit code constants for the semlock CLI.
//!
//! - 0: Success
//! - 1: User or configuration error
//! - 4: Lock acquisition failure
//! - 5: Lock release failure
//!
//! `semlock run` passes through the child's exit code when the child fails,
//! so codes outside this table can also appear.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config, or nothing to clear.
pub const USER_ERROR: i32 = 1;

/// Lock acquisition failure: timeout or the semaphore could not be obtained.
pub const ACQUIRE_FAILURE: i32 = 4;

/// Lock release failure: the lock was verified as ours but could not be removed.
pub const RELEASE_FAILURE: i32 = 5;
