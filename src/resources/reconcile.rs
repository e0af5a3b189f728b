//! The single reconciliation core shared by `install`, `link`, `unlink` and
//! `status`.
//!
//! Everything a run depends on (filesystem, home, repository root, force,
//! dry-run, the clock) is passed in explicitly, so the same decision tree
//! serves real runs, dry runs and tests.
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use super::backup::{BackupEntry, BackupManager};
use super::classify::{Classifier, Heuristics};
use super::error::ResourceError;
use super::paths::{PathResolver, paths_equal};
use super::report::{LinkKind, LinkResult, LinkStatus};
use super::sourceable::{DEFAULT_SOURCEABLE_FILES, SourceableResource};
use super::symlink::SymlinkResource;
use super::{Inspection, Linkable, ResourceChange};
use crate::operations::FileSystemOps;

/// Shared environment for the installers of one run.
#[derive(Debug)]
pub struct Reconciler {
    fs: Arc<dyn FileSystemOps>,
    paths: PathResolver,
    heuristics: Heuristics,
    backups: BackupManager,
    sourceable: Vec<String>,
    ignore: Vec<PathBuf>,
    force: bool,
    dry_run: bool,
    now: SystemTime,
    taken: Mutex<Vec<BackupEntry>>,
}

impl Reconciler {
    /// Create a reconciler with default heuristics and sourceable names,
    /// backing up into `<home>/.dotfiles-backups`.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystemOps>, paths: PathResolver) -> Self {
        let backups = BackupManager::new(Arc::clone(&fs), paths.home());
        Self {
            fs,
            paths,
            heuristics: Heuristics::default(),
            backups,
            sourceable: DEFAULT_SOURCEABLE_FILES
                .iter()
                .map(ToString::to_string)
                .collect(),
            ignore: Vec::new(),
            force: false,
            dry_run: false,
            now: SystemTime::now(),
            taken: Mutex::new(Vec::new()),
        }
    }

    /// Override the application-managed heuristics.
    #[must_use]
    pub fn with_heuristics(mut self, heuristics: Heuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Override the file names handled by the sourceable installer.
    #[must_use]
    pub fn with_sourceable(mut self, names: Vec<String>) -> Self {
        self.sourceable = names;
        self
    }

    /// Targets (as declared, `~` allowed) that are never touched.
    #[must_use]
    pub fn with_ignore(mut self, targets: &[String]) -> Self {
        self.ignore = targets
            .iter()
            .map(|t| self.paths.resolve_target(t))
            .collect();
        self
    }

    /// Run-level force flag; per-entry settings override it.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Compute and report, but perform no side effect.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Evaluate the recency heuristic against `now` instead of the time of
    /// construction.
    #[must_use]
    pub const fn at(mut self, now: SystemTime) -> Self {
        self.now = now;
        self
    }

    /// Filesystem used by every operation.
    #[must_use]
    pub fn fs(&self) -> &dyn FileSystemOps {
        self.fs.as_ref()
    }

    /// Path resolver for this run.
    #[must_use]
    pub const fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Backup manager for this run.
    #[must_use]
    pub const fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Whether side effects are suppressed.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Classifier bound to this run's filesystem, roots and clock.
    #[must_use]
    pub fn classifier(&self) -> Classifier<'_> {
        Classifier::new(self.fs.as_ref(), &self.paths, &self.heuristics, self.now)
    }

    /// Back up `path`, remembering the entry for the run state.
    ///
    /// # Errors
    ///
    /// Propagates [`BackupManager::backup`] failures.
    pub fn backup(&self, path: &Path) -> Result<BackupEntry, ResourceError> {
        let entry = self.backups.backup(path)?;
        if let Ok(mut taken) = self.taken.lock() {
            taken.push(entry.clone());
        }
        Ok(entry)
    }

    /// Backups taken so far in this run, in order.
    #[must_use]
    pub fn taken_backups(&self) -> Vec<BackupEntry> {
        self.taken.lock().map_or_else(|_| Vec::new(), |t| t.clone())
    }

    /// Whether `target` is handled by the sourceable installer.
    #[must_use]
    pub fn is_sourceable(&self, target: &Path) -> bool {
        target
            .file_name()
            .is_some_and(|name| self.sourceable.iter().any(|s| name == s.as_str()))
    }

    fn is_ignored(&self, target: &Path) -> bool {
        self.ignore.iter().any(|i| paths_equal(i, target))
    }

    /// Pick the installer for a declared entry.
    #[must_use]
    pub fn resource<'a>(&'a self, source: &str, target: &str) -> Box<dyn Linkable + 'a> {
        let source = self.paths.resolve_source(source);
        let target = self.paths.resolve_target(target);
        if self.is_sourceable(&target) {
            Box::new(SourceableResource::new(self, source, target))
        } else {
            Box::new(SymlinkResource::new(self, source, target))
        }
    }

    /// Reconcile one declared entry.
    #[must_use]
    pub fn install(&self, source: &str, target: &str, force: Option<bool>) -> LinkResult {
        let resource = self.resource(source, target);
        if self.is_ignored(resource.target()) {
            return LinkResult::new(
                resource.kind(),
                resource.target(),
                &self.paths.resolve_source(source),
                LinkStatus::Skipped,
            )
            .with_message("listed in ignore");
        }
        resource.install(force.unwrap_or(self.force))
    }

    /// Undo a declared entry's link if, and only if, it is the managed one.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected or changed.
    pub fn uninstall(&self, source: &str, target: &str) -> Result<ResourceChange, ResourceError> {
        let resource = self.resource(source, target);
        if self.is_ignored(resource.target()) {
            return Ok(ResourceChange::Skipped {
                reason: "listed in ignore".to_string(),
            });
        }
        resource.uninstall()
    }

    /// Classify a declared entry without side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected.
    pub fn inspect(
        &self,
        source: &str,
        target: &str,
    ) -> Result<(LinkKind, Inspection), ResourceError> {
        let resource = self.resource(source, target);
        Ok((resource.kind(), resource.inspect()?))
    }
}
