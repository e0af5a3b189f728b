//! Typed errors for configuration, run state and platform detection.
//!
//! Lower layers return these; commands and tasks wrap them in
//! [`anyhow::Error`] with `?` and add context there. Filesystem failures
//! while reconciling live in [`ResourceError`].

use std::path::PathBuf;

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {}", path.display())]
    NotFound {
        /// Expected location of the configuration file.
        path: PathBuf,
    },

    /// The TOML file contains a syntax or schema error.
    #[error("Invalid TOML in {}: {message}", path.display())]
    InvalidSyntax {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while reading or writing the persisted run state.
#[derive(Error, Debug)]
pub enum StateError {
    /// The state file could not be read or written.
    #[error("IO error on run state {}: {source}", path.display())]
    Io {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The state file exists but does not contain a valid run state.
    #[error("Corrupt run state {}: {source}", path.display())]
    Corrupt {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Errors that arise from platform-specific operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Neither `HOME` nor `USERPROFILE` is set.
    #[error("Cannot determine home directory: {0}")]
    HomeNotFound(String),
}
