//! Configuration model for semlock.
//!
//! This module defines the Config struct that can be loaded from a YAML file.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use operations::LOCK_DIR_ENV;
pub use types::BackendPreference;
