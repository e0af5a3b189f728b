//! Directory resource.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceState};
use crate::operations::{EntryKind, FileSystemOps};

/// A directory that should exist before anything is linked into it.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    fs: Arc<dyn FileSystemOps>,
    /// Directory to create.
    pub path: PathBuf,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(fs: Arc<dyn FileSystemOps>, path: PathBuf) -> Self {
        Self { fs, path }
    }
}

impl Resource for DirectoryResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn current_state(&self) -> Result<ResourceState> {
        let kind = self
            .fs
            .entry_kind(&self.path)
            .map_err(|e| ResourceError::fs("inspect", &self.path, e))?;
        Ok(match kind {
            EntryKind::Absent => ResourceState::Missing,
            EntryKind::Directory => ResourceState::Correct,
            // A symlink to a directory is fine; a dangling one is not.
            EntryKind::Symlink if self.path.is_dir() => ResourceState::Correct,
            other => ResourceState::Invalid {
                reason: format!("{other:?} exists at path"),
            },
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.current_state()? {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
            ResourceState::Missing => {
                self.fs
                    .create_dir_all(&self.path)
                    .map_err(|e| ResourceError::fs("create directory", &self.path, e))?;
                Ok(ResourceChange::Applied)
            }
        }
    }
}
