//! Symlink resource.
use std::path::{Path, PathBuf};

use super::classify::LinkDisposition;
use super::error::ResourceError;
use super::helpers::fs::{copy_into_place, ensure_parent_dir};
use super::reconcile::Reconciler;
use super::report::{LinkKind, LinkResult, LinkStatus};
use super::{Inspection, Linkable, ResourceChange};

/// A target that should be a symbolic link to a repository file.
#[derive(Debug, Clone)]
pub struct SymlinkResource<'a> {
    ctx: &'a Reconciler,
    /// The source file/directory (what the symlink points to).
    pub source: PathBuf,
    /// The target path (where the symlink will be created).
    pub target: PathBuf,
}

impl<'a> SymlinkResource<'a> {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(ctx: &'a Reconciler, source: PathBuf, target: PathBuf) -> Self {
        Self {
            ctx,
            source,
            target,
        }
    }

    /// Classify the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected.
    pub fn disposition(&self) -> Result<LinkDisposition, ResourceError> {
        self.ctx.classifier().classify(&self.target, &self.source)
    }

    fn result(&self, status: LinkStatus) -> LinkResult {
        LinkResult::new(LinkKind::Symlink, &self.target, &self.source, status)
    }

    fn conflict(&self, message: impl Into<String>) -> LinkResult {
        self.result(LinkStatus::Conflict).with_message(message)
    }

    fn failed(&self, err: &ResourceError) -> LinkResult {
        self.result(LinkStatus::Failed).with_message(err.to_string())
    }

    /// Act on an already computed disposition.
    ///
    /// In a dry run the planned status is returned with `changed` set and no
    /// side effect is performed.
    #[must_use]
    pub fn apply(&self, disposition: LinkDisposition, force: bool) -> LinkResult {
        let dry_run = self.ctx.is_dry_run();
        match disposition {
            LinkDisposition::SourceMissing => self.result(LinkStatus::SourceMissing).with_message(
                format!("source does not exist: {}", self.source.display()),
            ),
            LinkDisposition::AlreadyCorrect => self.result(LinkStatus::Linked),
            LinkDisposition::ManagedElsewhere { current } if !force => self.conflict(format!(
                "linked to {} in the repository; use --force to relink",
                current.display()
            )),
            LinkDisposition::ManagedElsewhere { current } => {
                if dry_run {
                    return self
                        .result(LinkStatus::Linked)
                        .changed()
                        .with_previous_link(current)
                        .with_message("would relink");
                }
                self.relink(current)
            }
            LinkDisposition::ForeignSymlink { current } => self.conflict(format!(
                "symlink to {} is not managed by dotfiles",
                current.display()
            )),
            LinkDisposition::PlainFile if !force => {
                self.conflict("regular file exists; use --force to back it up and replace it")
            }
            LinkDisposition::PlainFile => {
                if dry_run {
                    return self
                        .result(LinkStatus::Linked)
                        .changed()
                        .with_message("would back up and replace");
                }
                self.replace_file()
            }
            LinkDisposition::ApplicationManaged { reason } => self.conflict(format!(
                "file looks application-managed ({reason}); leaving it alone"
            )),
            LinkDisposition::Unmanageable { kind } => {
                self.conflict(format!("{kind:?} exists at target; remove it manually"))
            }
            LinkDisposition::Absent => {
                if dry_run {
                    return self
                        .result(LinkStatus::Linked)
                        .changed()
                        .with_message("would link");
                }
                match self.create_link() {
                    Ok(()) => self.result(LinkStatus::Linked).changed(),
                    Err(e) => self.failed(&e),
                }
            }
        }
    }

    fn create_link(&self) -> Result<(), ResourceError> {
        let fs = self.ctx.fs();
        ensure_parent_dir(fs, &self.target)?;
        fs.symlink(&self.source, &self.target)
            .map_err(|e| ResourceError::fs("create link", &self.target, e))
    }

    fn relink(&self, previous: PathBuf) -> LinkResult {
        let fs = self.ctx.fs();
        if let Err(e) = fs.remove_file(&self.target) {
            return self.failed(&ResourceError::fs("remove link", &self.target, e));
        }
        match self.create_link() {
            Ok(()) => self
                .result(LinkStatus::Linked)
                .changed()
                .with_previous_link(previous),
            Err(e) => {
                let restored = fs.symlink(&previous, &self.target).is_ok();
                let result = self.failed(&e).with_previous_link(previous);
                if restored { result } else { result.changed() }
            }
        }
    }

    /// Back up, unlink, link.  A failed backup stops before anything is
    /// removed; a failed link puts the backed-up file straight back.
    fn replace_file(&self) -> LinkResult {
        let fs = self.ctx.fs();
        let entry = match self.ctx.backup(&self.target) {
            Ok(entry) => entry,
            Err(e) => return self.failed(&e),
        };
        let backup_path = entry.backup_path.clone();

        if let Err(e) = fs.remove_file(&self.target) {
            return self
                .failed(&ResourceError::fs("remove", &self.target, e))
                .with_backup(backup_path);
        }

        match self.create_link() {
            Ok(()) => self
                .result(LinkStatus::Linked)
                .changed()
                .with_backup(backup_path),
            Err(e) => match copy_into_place(fs, &backup_path, &self.target) {
                Ok(()) => self.failed(&e).with_backup(backup_path),
                Err(restore) => self
                    .result(LinkStatus::Failed)
                    .changed()
                    .with_message(format!("{e}; original not restored ({restore})"))
                    .with_backup(backup_path),
            },
        }
    }
}

impl Linkable for SymlinkResource<'_> {
    fn kind(&self) -> LinkKind {
        LinkKind::Symlink
    }

    fn target(&self) -> &Path {
        &self.target
    }

    fn inspect(&self) -> Result<Inspection, ResourceError> {
        let d = self.disposition()?;
        Ok(Inspection {
            satisfied: d == LinkDisposition::AlreadyCorrect,
            label: d.to_string(),
        })
    }

    fn install(&self, force: bool) -> LinkResult {
        match self.disposition() {
            Ok(d) => self.apply(d, force),
            Err(e) => self.failed(&e),
        }
    }

    fn uninstall(&self) -> Result<ResourceChange, ResourceError> {
        match self.disposition()? {
            LinkDisposition::AlreadyCorrect => {
                if !self.ctx.is_dry_run() {
                    self.ctx
                        .fs()
                        .remove_file(&self.target)
                        .map_err(|e| ResourceError::fs("remove link", &self.target, e))?;
                }
                Ok(ResourceChange::Applied)
            }
            LinkDisposition::Absent | LinkDisposition::SourceMissing => {
                Ok(ResourceChange::AlreadyCorrect)
            }
            other => Ok(ResourceChange::Skipped {
                reason: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::{FaultyFs, FileSystemOps, FsOp, SystemFileSystemOps};
    use crate::resources::paths::PathResolver;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    struct Fixture {
        _dir: tempfile::TempDir,
        home: PathBuf,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let home = dir.path().join("home");
            let root = home.join("dotfiles");
            std::fs::create_dir_all(root.join("git")).unwrap();
            std::fs::write(root.join("git/gitconfig"), "[user]\n\tname = repo\n").unwrap();
            std::fs::write(root.join("git/gitconfig.work"), "[user]\n").unwrap();
            Self {
                _dir: dir,
                home,
                root,
            }
        }

        fn reconciler(&self) -> Reconciler {
            self.reconciler_with(Arc::new(SystemFileSystemOps), false)
        }

        fn reconciler_with(&self, fs: Arc<dyn FileSystemOps>, dry_run: bool) -> Reconciler {
            Reconciler::new(fs, PathResolver::new(&self.home, &self.root))
                .dry_run(dry_run)
                .at(SystemTime::now() + Duration::from_secs(2 * 60 * 60))
        }

        fn source(&self) -> PathBuf {
            self.root.join("git/gitconfig")
        }

        fn target(&self) -> PathBuf {
            self.home.join(".gitconfig")
        }

        fn install(&self, ctx: &Reconciler, force: bool) -> LinkResult {
            SymlinkResource::new(ctx, self.source(), self.target()).install(force)
        }
    }

    fn link_destination(path: &Path) -> PathBuf {
        std::fs::read_link(path).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn absent_target_is_linked() {
        let fx = Fixture::new();
        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Linked);
        assert!(r.changed);
        assert_eq!(link_destination(&fx.target()), fx.source());
    }

    #[cfg(unix)]
    #[test]
    fn parent_directories_are_created() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        let target = fx.home.join("deep/nested/gitconfig");
        let r = SymlinkResource::new(&ctx, fx.source(), target.clone()).install(false);
        assert_eq!(r.status, LinkStatus::Linked);
        assert_eq!(link_destination(&target), fx.source());
    }

    #[cfg(unix)]
    #[test]
    fn second_install_is_a_noop() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        fx.install(&ctx, false);
        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Linked);
        assert!(!r.changed);
        assert!(r.backup_path.is_none());
        assert!(ctx.taken_backups().is_empty());
    }

    #[test]
    fn missing_source_has_no_side_effect() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        let r = SymlinkResource::new(&ctx, fx.root.join("nope"), fx.target()).install(true);
        assert_eq!(r.status, LinkStatus::SourceMissing);
        assert!(fx.target().symlink_metadata().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn managed_elsewhere_without_force_is_untouched_conflict() {
        let fx = Fixture::new();
        let other = fx.root.join("git/gitconfig.work");
        std::os::unix::fs::symlink(&other, fx.target()).unwrap();

        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Conflict);
        assert!(!r.changed);
        assert_eq!(link_destination(&fx.target()), other);
    }

    #[cfg(unix)]
    #[test]
    fn managed_elsewhere_with_force_is_relinked() {
        let fx = Fixture::new();
        let other = fx.root.join("git/gitconfig.work");
        std::os::unix::fs::symlink(&other, fx.target()).unwrap();

        let r = fx.install(&fx.reconciler(), true);
        assert_eq!(r.status, LinkStatus::Linked);
        assert_eq!(r.previous_link, Some(other));
        assert_eq!(link_destination(&fx.target()), fx.source());
    }

    #[cfg(unix)]
    #[test]
    fn foreign_symlink_is_never_replaced() {
        let fx = Fixture::new();
        let foreign = fx.home.join("elsewhere/gitconfig");
        std::fs::create_dir_all(foreign.parent().unwrap()).unwrap();
        std::fs::write(&foreign, "theirs").unwrap();
        std::os::unix::fs::symlink(&foreign, fx.target()).unwrap();

        for force in [false, true] {
            let r = fx.install(&fx.reconciler(), force);
            assert_eq!(r.status, LinkStatus::Conflict, "force={force}");
            assert_eq!(link_destination(&fx.target()), foreign);
        }
        assert_eq!(std::fs::read_to_string(&foreign).unwrap(), "theirs");
    }

    #[test]
    fn application_managed_file_is_never_replaced() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "fresh").unwrap();
        let ctx = Reconciler::new(
            Arc::new(SystemFileSystemOps),
            PathResolver::new(&fx.home, &fx.root),
        );

        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Conflict);
        assert!(r.message.unwrap().contains("application-managed"));
        assert_eq!(std::fs::read_to_string(fx.target()).unwrap(), "fresh");
        assert!(ctx.taken_backups().is_empty());
    }

    #[test]
    fn plain_file_without_force_is_conflict() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "mine").unwrap();
        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Conflict);
        assert_eq!(std::fs::read_to_string(fx.target()).unwrap(), "mine");
    }

    #[cfg(unix)]
    #[test]
    fn plain_file_with_force_is_backed_up_then_replaced() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "[user]\n\tname = mine\n").unwrap();
        let ctx = fx.reconciler();

        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Linked);
        let backup = r.backup_path.expect("backup path");
        assert_eq!(
            std::fs::read_to_string(&backup).unwrap(),
            "[user]\n\tname = mine\n"
        );
        assert_eq!(link_destination(&fx.target()), fx.source());
        assert_eq!(ctx.taken_backups().len(), 1);
    }

    #[test]
    fn failed_backup_never_removes_the_file() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "mine").unwrap();
        let fs = Arc::new(FaultyFs::failing(&[FsOp::Copy]));
        let ctx = fx.reconciler_with(fs.clone(), false);

        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Failed);
        assert!(r.message.unwrap().contains("backup"));
        assert!(fs.calls_to(FsOp::RemoveFile).is_empty());
        assert!(fs.calls_to(FsOp::Symlink).is_empty());
        assert_eq!(std::fs::read_to_string(fx.target()).unwrap(), "mine");
    }

    #[test]
    fn failed_link_restores_the_backed_up_file() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "mine").unwrap();
        let ctx = fx.reconciler_with(Arc::new(FaultyFs::failing(&[FsOp::Symlink])), false);

        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Failed);
        assert!(!r.changed);
        assert!(r.backup_path.is_some());
        assert_eq!(std::fs::read_to_string(fx.target()).unwrap(), "mine");
    }

    #[test]
    fn failed_link_on_absent_target_is_reported_per_entry() {
        let fx = Fixture::new();
        let ctx = fx.reconciler_with(Arc::new(FaultyFs::failing(&[FsOp::Symlink])), false);
        let r = fx.install(&ctx, false);
        assert_eq!(r.status, LinkStatus::Failed);
        assert!(r.message.unwrap().contains("create link"));
    }

    #[test]
    fn real_directory_is_conflict() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.target()).unwrap();
        let r = fx.install(&fx.reconciler(), true);
        assert_eq!(r.status, LinkStatus::Conflict);
        assert!(fx.target().is_dir());
    }

    #[test]
    fn dry_run_reports_plan_without_touching_anything() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "mine").unwrap();
        let ctx = fx.reconciler_with(Arc::new(SystemFileSystemOps), true);

        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Linked);
        assert!(r.changed);
        assert_eq!(r.message.as_deref(), Some("would back up and replace"));
        assert_eq!(std::fs::read_to_string(fx.target()).unwrap(), "mine");
        assert!(!fx.home.join(".dotfiles-backups").exists());
    }

    #[cfg(unix)]
    #[test]
    fn uninstall_removes_only_correct_links() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        fx.install(&ctx, false);
        let res = SymlinkResource::new(&ctx, fx.source(), fx.target());
        assert_eq!(res.uninstall().unwrap(), ResourceChange::Applied);
        assert!(fx.target().symlink_metadata().is_err());
        assert_eq!(res.uninstall().unwrap(), ResourceChange::AlreadyCorrect);

        std::fs::write(fx.target(), "mine").unwrap();
        assert!(matches!(
            res.uninstall().unwrap(),
            ResourceChange::Skipped { .. }
        ));
        assert_eq!(std::fs::read_to_string(fx.target()).unwrap(), "mine");
    }

    #[cfg(unix)]
    #[test]
    fn inspect_reports_satisfied_link() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        let res = SymlinkResource::new(&ctx, fx.source(), fx.target());
        assert!(!res.inspect().unwrap().satisfied);
        res.install(false);
        let i = res.inspect().unwrap();
        assert!(i.satisfied);
        assert_eq!(i.label, "linked");
    }
}
