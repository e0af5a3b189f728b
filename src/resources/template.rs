//! Template resource: a repository file copied once to a machine-local path.
//!
//! Once created the copy belongs to the user; it is never overwritten, even
//! with `--force`.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ResourceError;
use super::helpers::fs::copy_into_place;
use super::{Resource, ResourceChange, ResourceState};
use crate::operations::{EntryKind, FileSystemOps};

/// A template source and the local file it seeds.
#[derive(Debug, Clone)]
pub struct TemplateResource {
    fs: Arc<dyn FileSystemOps>,
    /// Repository file to copy.
    pub source: PathBuf,
    /// Machine-local file to create.
    pub target: PathBuf,
}

impl TemplateResource {
    /// Create a new template resource.
    #[must_use]
    pub const fn new(fs: Arc<dyn FileSystemOps>, source: PathBuf, target: PathBuf) -> Self {
        Self { fs, source, target }
    }
}

impl Resource for TemplateResource {
    fn description(&self) -> String {
        format!("{} (from {})", self.target.display(), self.source.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let source = self
            .fs
            .entry_kind(&self.source)
            .map_err(|e| ResourceError::fs("inspect", &self.source, e))?;
        if source == EntryKind::Absent {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }
        let target = self
            .fs
            .entry_kind(&self.target)
            .map_err(|e| ResourceError::fs("inspect", &self.target, e))?;
        Ok(if target == EntryKind::Absent {
            ResourceState::Missing
        } else {
            ResourceState::Correct
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.current_state()? {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
            ResourceState::Missing => {
                copy_into_place(self.fs.as_ref(), &self.source, &self.target)?;
                Ok(ResourceChange::Applied)
            }
        }
    }
}
