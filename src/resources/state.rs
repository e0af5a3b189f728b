//! Persisted record of the most recent non-dry-run.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backup::BackupEntry;
use super::helpers::fs::{read_text, write_atomic};
use super::report::LinkResult;
use crate::error::StateError;
use crate::operations::{EntryKind, FileSystemOps};

/// File name of the run state inside the home directory.
pub const STATE_FILE_NAME: &str = ".dotfiles-state.json";

/// What the last run did, in entry order; enough to roll it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Command that produced the run (`install`, `link`).
    #[serde(default)]
    pub command: String,
    /// One result per declared entry.
    pub results: Vec<LinkResult>,
    /// Backups taken during the run.
    #[serde(default)]
    pub backups: Vec<BackupEntry>,
}

impl RunState {
    /// Build a state record stamped with the current time.
    #[must_use]
    pub fn new(command: &str, results: Vec<LinkResult>, backups: Vec<BackupEntry>) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.to_string(),
            results,
            backups,
        }
    }

    /// Whether the run changed anything that rollback could undo.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.results.iter().any(|r| r.changed)
    }
}

/// Loads and saves the [`RunState`] file.
#[derive(Debug, Clone)]
pub struct StateStore {
    fs: Arc<dyn FileSystemOps>,
    path: PathBuf,
}

impl StateStore {
    /// Store at `<home>/.dotfiles-state.json`.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystemOps>, home: &Path) -> Self {
        Self {
            fs,
            path: home.join(STATE_FILE_NAME),
        }
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last run, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Corrupt`] if the file is not a valid run state,
    /// or [`StateError::Io`] if it cannot be read.
    pub fn load(&self) -> Result<Option<RunState>, StateError> {
        let kind = self.fs.entry_kind(&self.path).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;
        if kind == EntryKind::Absent {
            return Ok(None);
        }
        let text = read_text(self.fs.as_ref(), &self.path).map_err(|e| self.io_error(e))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the state file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the file cannot be written.
    pub fn save(&self, state: &RunState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(self.fs.as_ref(), &self.path, json.as_bytes()).map_err(|e| self.io_error(e))
    }

    /// Delete the state file; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), StateError> {
        match self.fs.remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(StateError::Io {
                path: self.path.clone(),
                source: e,
            }),
            _ => Ok(()),
        }
    }

    fn io_error(&self, e: super::error::ResourceError) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source: std::io::Error::other(e.to_string()),
        }
    }
}
