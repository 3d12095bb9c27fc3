//! Parsing and validation of `quire.toml` pipeline configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`QuireConfig`], plus a [`ResolvedEnvironment`] whose paths are anchored
//! to the project directory and whose extensions are normalized.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_environment, ResolvedEnvironment};
pub use types::*;
