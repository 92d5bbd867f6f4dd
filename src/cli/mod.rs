//! CLI argument parsing for semlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use semlock::SemaphoreKey;
use semlock::config::BackendPreference;
use std::path::PathBuf;

/// Semlock: mutual exclusion between processes on one host, keyed by integers.
///
/// Uses System V semaphores when available and lock files in a shared
/// directory otherwise.
#[derive(Parser, Debug)]
#[command(name = "semlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a YAML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend to use (auto, native, filesystem). Overrides the config file.
    #[arg(long, global = true, value_parser = parse_backend)]
    pub backend: Option<BackendPreference>,

    /// Directory for lock files. Overrides the config file and SEMLOCK_LOCK_DIR.
    #[arg(long, global = true)]
    pub lock_dir: Option<PathBuf>,

    /// Log protocol steps to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for semlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding a semaphore.
    ///
    /// Acquires the key, runs the command, and releases the key when the
    /// command exits. Exits with the command's exit code.
    Run(RunArgs),

    /// Show who holds a key, or list every lock file.
    Status(StatusArgs),

    /// Forcibly remove an orphaned lock.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(ClearArgs),

    /// Report native semaphore support and the effective settings.
    Probe,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Semaphore key.
    #[arg(short, long, allow_negative_numbers = true)]
    pub key: SemaphoreKey,

    /// Maximum time to wait for the lock, in milliseconds (filesystem backend).
    #[arg(long)]
    pub wait_ms: Option<u64>,

    /// Poll interval while waiting, in milliseconds (filesystem backend).
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Command and arguments to run.
    #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Key to inspect. If omitted, lists all lock files.
    #[arg(short, long, allow_negative_numbers = true)]
    pub key: Option<SemaphoreKey>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Key whose lock should be cleared.
    #[arg(short, long, allow_negative_numbers = true)]
    pub key: SemaphoreKey,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

fn parse_backend(s: &str) -> Result<BackendPreference, String> {
    BackendPreference::from_str(s)
        .ok_or_else(|| format!("unknown backend '{}' (expected auto, native, or filesystem)", s))
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
