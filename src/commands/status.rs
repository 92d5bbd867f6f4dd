//! Implementation of the `semlock status` and `semlock clear` commands.

use crate::cli::{ClearArgs, StatusArgs};
use semlock::backend::{BackendKind, FileBackend, LockFileInfo, NativeBackend};
use semlock::config::Config;
use semlock::error::{Result, SemaphoreError};
use semlock::manager::select_backend;
use serde_json::json;

/// Execute the `semlock status` command.
pub fn cmd_status(config: &Config, args: StatusArgs) -> Result<()> {
    match select_backend(config)?.kind() {
        BackendKind::Filesystem => status_file(config, args),
        BackendKind::Native => status_native(args),
    }
}

fn status_file(config: &Config, args: StatusArgs) -> Result<()> {
    let backend = FileBackend::new(config);
    let stale_after = config.stale_after();

    let locks: Vec<LockFileInfo> = match args.key {
        Some(key) => backend.inspect(key)?.into_iter().collect(),
        None => backend.list()?,
    };

    if args.json {
        let entries: Vec<_> = locks
            .iter()
            .map(|lock| {
                json!({
                    "path": lock.path,
                    "key": lock.key,
                    "holder": lock.holder,
                    "modified_at": lock.modified_at,
                    "age_seconds": lock.age().num_seconds(),
                    "stale": lock.is_stale(stale_after),
                })
            })
            .collect();
        print_json(&json!({
            "backend": "filesystem",
            "lock_dir": backend.lock_dir(),
            "locks": entries,
        }))?;
        return Ok(());
    }

    if locks.is_empty() {
        match args.key {
            Some(key) => println!("Key {} is free.", key),
            None => println!("No active locks in {}.", backend.lock_dir().display()),
        }
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for lock in &locks {
        match lock.key {
            Some(key) => println!("  Key {}:", key),
            None => println!("  Lock file:"),
        }
        if lock.holder.is_empty() {
            println!("    Holder:     <empty>");
        } else {
            println!("    Holder:     {}", lock.holder);
        }
        println!("    Modified:   {}", lock.modified_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("    Age:        {}", lock.age_string());
        if lock.is_stale(stale_after) {
            println!(
                "    Status:     STALE (exceeds {}s threshold)",
                config.stale_after_secs
            );
        }
        println!("    Path:       {}", lock.path.display());
        println!();
    }

    let stale_count = locks.iter().filter(|l| l.is_stale(stale_after)).count();
    if stale_count > 0 {
        println!(
            "Note: {} lock(s) are stale. Use `semlock clear --key <key> --force` to clear.",
            stale_count
        );
    }

    Ok(())
}

fn status_native(args: StatusArgs) -> Result<()> {
    let key = args.key.ok_or_else(|| {
        SemaphoreError::UserError(
            "--key is required with the native backend (semaphore sets cannot be listed)"
                .to_string(),
        )
    })?;

    let backend = NativeBackend::new()?;
    let info = backend.inspect(key)?;

    if args.json {
        return print_json(&json!({
            "backend": "native",
            "key": key,
            "semaphore": info,
        }));
    }

    match info {
        Some(info) if info.held => {
            println!("Key {} is held.", key);
            println!("  Semaphore id: {}", info.sem_id);
            println!("  Last PID:     {}", info.last_pid);
        }
        Some(info) => println!("Key {} is free (semaphore id {}).", key, info.sem_id),
        None => println!("Key {} is free (no semaphore exists).", key),
    }

    Ok(())
}

/// Execute the `semlock clear` command.
pub fn cmd_clear(config: &Config, args: ClearArgs) -> Result<()> {
    if !args.force {
        return Err(SemaphoreError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock whose holder is still running breaks mutual exclusion.\n\
             Only clear locks if you are certain the holder has died.\n\n\
             To clear the lock, run:\n  semlock clear --key {} --force",
            args.key
        )));
    }

    match select_backend(config)?.kind() {
        BackendKind::Filesystem => {
            let cleared = FileBackend::new(config).clear(args.key)?;
            println!("Cleared lock for key {}", args.key);
            println!();
            println!("Lock details:");
            println!("  Holder:     {}", cleared.holder);
            println!("  Age:        {}", cleared.age_string());
            println!("  Path:       {}", cleared.path.display());
        }
        BackendKind::Native => {
            let removed = NativeBackend::new()?.remove(args.key)?;
            println!("Removed native semaphore for key {}", args.key);
            println!("  Semaphore id: {}", removed.sem_id);
            println!("  Was held:     {}", if removed.held { "yes" } else { "no" });
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SemaphoreError::UserError(format!("failed to serialize status: {}", e)))?;
    println!("{}", text);
    Ok(())
}
