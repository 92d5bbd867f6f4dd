//! Command implementations for semlock.
//!
//! This module resolves the effective configuration (config file, then
//! environment, then command-line flags) and routes each command to its
//! implementation.

mod run;
mod status;

use crate::cli::{Cli, Command};
use semlock::config::Config;
use semlock::error::Result;
use semlock::manager::select_backend;
use semlock::NativeBackend;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Run(args) => run::cmd_run(config, args),
        Command::Status(args) => status::cmd_status(&config, args),
        Command::Clear(args) => status::cmd_clear(&config, args),
        Command::Probe => cmd_probe(&config),
    }
}

/// Build the effective config for this invocation.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    config.apply_env_overrides();

    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = &cli.lock_dir {
        config.lock_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

fn cmd_probe(config: &Config) -> Result<()> {
    let native = NativeBackend::is_supported();
    println!(
        "Native semaphores: {}",
        if native { "supported" } else { "unavailable" }
    );
    println!("Preference:        {}", config.backend.as_str());

    let backend = select_backend(config)?;
    println!("Selected backend:  {}", backend.kind());
    println!("Lock directory:    {}", config.resolved_lock_dir().display());
    println!("Poll interval:     {}ms", config.poll_interval_ms);
    println!("Wait budget:       {}ms", config.wait_budget_ms);

    Ok(())
}
