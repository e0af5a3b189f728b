//! Classification of whatever currently occupies a link target.
//!
//! The classifier never mutates anything.  It is re-run for every entry on
//! every invocation; nothing about a target is cached between runs because
//! the home directory is shared with the user and other applications.
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::error::ResourceError;
use super::paths::{PathResolver, normalize, paths_equal};
use crate::operations::{EntryKind, FileSystemOps};

/// Default age below which a regular file is treated as freshly written by
/// another application.
pub const DEFAULT_RECENT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default path segment marking a shared per-application config directory.
pub const DEFAULT_CONFIG_DIR_SEGMENT: &str = ".config";

/// Tunables for the application-managed heuristic.
///
/// Both checks are best effort: a false positive turns an overwrite into a
/// conflict, a false negative still backs the file up before replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heuristics {
    /// Files modified more recently than this are left alone.
    pub recent_window: Duration,
    /// Files whose path contains this component are left alone.
    pub config_dir_segment: String,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            config_dir_segment: DEFAULT_CONFIG_DIR_SEGMENT.to_string(),
        }
    }
}

/// Why a regular file was judged to belong to another application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedReason {
    /// The file was written within the recent window.
    RecentlyModified {
        /// How long ago it was modified (zero for timestamps in the future).
        age: Duration,
    },
    /// The file lives under the shared config directory.
    ConfigDirectory {
        /// The matching path segment.
        segment: String,
    },
}

impl fmt::Display for ManagedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecentlyModified { age } => {
                write!(f, "modified {}s ago", age.as_secs())
            }
            Self::ConfigDirectory { segment } => write!(f, "inside {segment}/"),
        }
    }
}

/// The classified state of a target path prior to deciding an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDisposition {
    /// Target is a symlink already pointing at the resolved source.
    AlreadyCorrect,
    /// Target is a symlink into the repository, but to a different file.
    ManagedElsewhere {
        /// The link's current destination.
        current: PathBuf,
    },
    /// Target is a symlink whose destination lies outside the repository.
    ForeignSymlink {
        /// The link's current destination.
        current: PathBuf,
    },
    /// Target is a regular file.
    PlainFile,
    /// Target is a regular file that another application probably maintains.
    ApplicationManaged {
        /// Which heuristic fired.
        reason: ManagedReason,
    },
    /// Target is a real directory or a special file; never replaced.
    Unmanageable {
        /// What was found.
        kind: EntryKind,
    },
    /// Nothing exists at the target.
    Absent,
    /// The declared source does not exist in the repository.
    SourceMissing,
}

impl LinkDisposition {
    /// Short label used in status output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AlreadyCorrect => "linked",
            Self::ManagedElsewhere { .. } => "linked elsewhere",
            Self::ForeignSymlink { .. } => "foreign symlink",
            Self::PlainFile => "regular file",
            Self::ApplicationManaged { .. } => "application-managed",
            Self::Unmanageable { .. } => "unmanageable",
            Self::Absent => "not linked",
            Self::SourceMissing => "source missing",
        }
    }
}

impl fmt::Display for LinkDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManagedElsewhere { current } | Self::ForeignSymlink { current } => {
                write!(f, "{} -> {}", self.label(), current.display())
            }
            Self::ApplicationManaged { reason } => write!(f, "{} ({reason})", self.label()),
            Self::Unmanageable { kind } => write!(f, "{} ({kind:?})", self.label()),
            _ => f.write_str(self.label()),
        }
    }
}

/// Inspects targets and classifies them into a [`LinkDisposition`].
#[derive(Debug)]
pub struct Classifier<'a> {
    fs: &'a dyn FileSystemOps,
    paths: &'a PathResolver,
    heuristics: &'a Heuristics,
    now: SystemTime,
}

impl<'a> Classifier<'a> {
    /// Create a classifier evaluating the recency heuristic against `now`.
    #[must_use]
    pub const fn new(
        fs: &'a dyn FileSystemOps,
        paths: &'a PathResolver,
        heuristics: &'a Heuristics,
        now: SystemTime,
    ) -> Self {
        Self {
            fs,
            paths,
            heuristics,
            now,
        }
    }

    /// Classify `target` against the declared, already-resolved `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Filesystem`] if the target's metadata or link
    /// destination cannot be read for a reason other than absence.
    pub fn classify(&self, target: &Path, source: &Path) -> Result<LinkDisposition, ResourceError> {
        if !self.source_exists(source)? {
            return Ok(LinkDisposition::SourceMissing);
        }

        let kind = self
            .fs
            .entry_kind(target)
            .map_err(|e| ResourceError::fs("inspect", target, e))?;

        match kind {
            EntryKind::Absent => Ok(LinkDisposition::Absent),
            EntryKind::Symlink => self.classify_symlink(target, source),
            EntryKind::File => self.classify_file(target),
            EntryKind::Directory | EntryKind::Other => Ok(LinkDisposition::Unmanageable { kind }),
        }
    }

    /// Whether the declared source exists (a dangling symlink in the
    /// repository still counts as present).
    ///
    /// # Errors
    ///
    /// Returns an error if the source's metadata cannot be read.
    pub fn source_exists(&self, source: &Path) -> Result<bool, ResourceError> {
        self.fs
            .entry_kind(source)
            .map(|k| k != EntryKind::Absent)
            .map_err(|e| ResourceError::fs("inspect source", source, e))
    }

    fn classify_symlink(
        &self,
        target: &Path,
        source: &Path,
    ) -> Result<LinkDisposition, ResourceError> {
        let current = self
            .fs
            .read_link(target)
            .map_err(|e| ResourceError::fs("read link", target, e))?;
        let resolved = resolve_link_destination(target, &current);

        if paths_equal(&resolved, source) {
            Ok(LinkDisposition::AlreadyCorrect)
        } else if self.paths.is_inside_root(&resolved) {
            Ok(LinkDisposition::ManagedElsewhere { current })
        } else {
            Ok(LinkDisposition::ForeignSymlink { current })
        }
    }

    fn classify_file(&self, target: &Path) -> Result<LinkDisposition, ResourceError> {
        let modified = self
            .fs
            .modified(target)
            .map_err(|e| ResourceError::fs("read mtime", target, e))?;
        let age = self.now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < self.heuristics.recent_window {
            return Ok(LinkDisposition::ApplicationManaged {
                reason: ManagedReason::RecentlyModified { age },
            });
        }

        let segment = self.heuristics.config_dir_segment.as_str();
        if !segment.is_empty() && target.components().any(|c| c.as_os_str() == segment) {
            return Ok(LinkDisposition::ApplicationManaged {
                reason: ManagedReason::ConfigDirectory {
                    segment: segment.to_string(),
                },
            });
        }

        Ok(LinkDisposition::PlainFile)
    }
}

/// Resolve a link's immediate destination one level: relative destinations
/// are taken relative to the link's parent directory.
#[must_use]
pub fn resolve_link_destination(link: &Path, destination: &Path) -> PathBuf {
    if destination.is_absolute() {
        normalize(destination)
    } else {
        let parent = link.parent().unwrap_or_else(|| Path::new(""));
        normalize(&parent.join(destination))
    }
}
