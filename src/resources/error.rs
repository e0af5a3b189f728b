//! Typed error variants for resource operations.
//!
//! This module provides [`ResourceError`], a structured error type for the
//! installers and the backup manager.  Per-entry failures are folded into a
//! [`LinkResult`](super::report::LinkResult) by the installers; the backup and
//! restore commands surface them through [`anyhow::Error`] via `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise from link, backup and restore operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A filesystem call failed unexpectedly (permissions, disk full, race).
    #[error("{op} {}: {source}", path.display())]
    Filesystem {
        /// Short name of the operation (e.g. `"create link"`).
        op: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Copying a file into the backup store failed; nothing was overwritten.
    #[error("backup of {} failed: {source}", path.display())]
    BackupFailed {
        /// File that could not be backed up.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No backup with the requested identifier exists.
    #[error("no backup found for '{id}'")]
    BackupNotFound {
        /// Identifier (or path) that was looked up.
        id: String,
    },

    /// The backup index could not be parsed.
    #[error("backup index {} is corrupt: {source}", path.display())]
    CorruptIndex {
        /// Path of the index file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Restoring would clobber something the caller did not ask to overwrite.
    #[error("refusing to restore over {}: {reason}", path.display())]
    RestoreRefused {
        /// Original path the backup would be restored to.
        path: PathBuf,
        /// Why the restore was refused.
        reason: String,
    },
}

impl ResourceError {
    /// Shorthand for [`ResourceError::Filesystem`].
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }
}
