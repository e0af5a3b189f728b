//! Per-entry outcomes of a link run and their aggregate summary.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Final status of one declared entry after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    /// The target now (or already) points at the source.
    Linked,
    /// The entry was deliberately not considered (ignore list).
    Skipped,
    /// Something the tool will not touch occupies the target.
    Conflict,
    /// The declared source does not exist in the repository.
    SourceMissing,
    /// A filesystem operation failed while handling the entry.
    Failed,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linked => "linked",
            Self::Skipped => "skipped",
            Self::Conflict => "conflict",
            Self::SourceMissing => "source-missing",
            Self::Failed => "failed",
        })
    }
}

/// How an entry's target is wired to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// The target is a symbolic link to the source.
    Symlink,
    /// The target is a shell startup file that sources the source.
    Sourceable,
}

/// Outcome of reconciling one declared entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResult {
    /// Resolved target path.
    pub target: PathBuf,
    /// Resolved source path.
    pub source: PathBuf,
    /// Installer that handled the entry.
    pub kind: LinkKind,
    /// Final status.
    pub status: LinkStatus,
    /// Whether the target was modified by this run (planned, in a dry run).
    #[serde(default)]
    pub changed: bool,
    /// Destination of a symlink that was replaced, so rollback can recreate it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_link: Option<PathBuf>,
    /// Where the displaced file was backed up to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Human-readable detail (conflict reason, failure cause, planned action).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LinkResult {
    /// Create an unchanged result with no detail.
    #[must_use]
    pub fn new(kind: LinkKind, target: &Path, source: &Path, status: LinkStatus) -> Self {
        Self {
            target: target.to_path_buf(),
            source: source.to_path_buf(),
            kind,
            status,
            changed: false,
            previous_link: None,
            backup_path: None,
            message: None,
        }
    }

    /// Mark the target as modified.
    #[must_use]
    pub const fn changed(mut self) -> Self {
        self.changed = true;
        self
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Record the backup of the displaced file.
    #[must_use]
    pub fn with_backup(mut self, backup_path: PathBuf) -> Self {
        self.backup_path = Some(backup_path);
        self
    }

    /// Record the destination of a replaced symlink.
    #[must_use]
    pub fn with_previous_link(mut self, previous: PathBuf) -> Self {
        self.previous_link = Some(previous);
        self
    }
}

/// Counts over a set of [`LinkResult`]s.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries that were linked by this run.
    pub linked: u32,
    /// Entries that were already linked.
    pub unchanged: u32,
    /// Entries left alone because of a conflict.
    pub conflicts: u32,
    /// Entries whose source is missing.
    pub source_missing: u32,
    /// Entries excluded by the ignore list.
    pub skipped: u32,
    /// Entries that failed.
    pub failed: u32,
    /// Files backed up before being replaced.
    pub backups: u32,
}

impl RunSummary {
    /// Tally `results`.
    #[must_use]
    pub fn from_results(results: &[LinkResult]) -> Self {
        let mut s = Self::default();
        for r in results {
            match r.status {
                LinkStatus::Linked if r.changed => s.linked += 1,
                LinkStatus::Linked => s.unchanged += 1,
                LinkStatus::Conflict => s.conflicts += 1,
                LinkStatus::SourceMissing => s.source_missing += 1,
                LinkStatus::Skipped => s.skipped += 1,
                LinkStatus::Failed => s.failed += 1,
            }
            if r.backup_path.is_some() {
                s.backups += 1;
            }
        }
        s
    }

    /// Total number of entries.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.linked
            + self.unchanged
            + self.conflicts
            + self.source_missing
            + self.skipped
            + self.failed
    }

    /// Whether any entry needs the user's attention.
    #[must_use]
    pub const fn has_problems(&self) -> bool {
        self.conflicts > 0 || self.source_missing > 0 || self.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} linked, {} unchanged, {} conflicts, {} missing, {} skipped, {} failed",
            self.linked,
            self.unchanged,
            self.conflicts,
            self.source_missing,
            self.skipped,
            self.failed
        )
    }
}
