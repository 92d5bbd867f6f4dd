//! Implementation of the `semlock run` command.
//!
//! Holds a semaphore for the lifetime of a child process.

use crate::cli::RunArgs;
use semlock::config::Config;
use semlock::error::{Result, SemaphoreError};
use semlock::manager::SemaphoreManager;
use std::process::Command;
use tracing::debug;

/// Execute the `semlock run` command.
///
/// The lock is released before the child's exit status is inspected, so a
/// failing child never leaves the key held.
pub fn cmd_run(mut config: Config, args: RunArgs) -> Result<()> {
    if let Some(wait_ms) = args.wait_ms {
        config.wait_budget_ms = wait_ms;
    }
    if let Some(poll_ms) = args.poll_ms {
        config.poll_interval_ms = poll_ms;
    }
    config.validate()?;

    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| SemaphoreError::UserError("no command given to run".to_string()))?;

    let manager = SemaphoreManager::new(&config)?;
    let guard = manager.acquire(args.key)?;
    debug!(key = %args.key, backend = %manager.backend_kind(), %program, "running command under lock");

    let status = Command::new(program).args(program_args).status();

    guard.release()?;

    let status = status.map_err(|e| {
        SemaphoreError::UserError(format!("failed to run '{}': {}", program, e))
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(SemaphoreError::CommandFailed {
            code: status.code().unwrap_or(1),
        })
    }
}
