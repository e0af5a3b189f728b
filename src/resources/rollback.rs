//! Undo the last recorded run.
//!
//! Results are unwound in reverse order, and a target is only touched while
//! it is still exactly what the run left there.
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::backup::{BackupEntry, BackupManager};
use super::classify::resolve_link_destination;
use super::error::ResourceError;
use super::helpers::fs::read_bytes;
use super::paths::{PathResolver, paths_equal};
use super::report::{LinkKind, LinkResult};
use super::sourceable::contains_directive;
use super::state::RunState;
use crate::operations::{EntryKind, FileSystemOps};

/// Outcome of one rollback step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The target was put back (or, in a dry run, would be).
    Reverted {
        /// What was done.
        detail: String,
    },
    /// The step was deliberately not performed.
    Skipped {
        /// Why.
        reason: String,
    },
    /// A filesystem operation failed.
    Failed {
        /// The error.
        error: String,
    },
}

/// One target handled during rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackStep {
    /// Path that was examined.
    pub target: PathBuf,
    /// What happened.
    pub outcome: StepOutcome,
}

/// All steps of a rollback, in the order they were performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Steps in processing order (reverse of the run).
    pub steps: Vec<RollbackStep>,
}

impl RollbackReport {
    fn push(&mut self, target: &Path, outcome: StepOutcome) {
        self.steps.push(RollbackStep {
            target: target.to_path_buf(),
            outcome,
        });
    }

    fn count(&self, f: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| f(&s.outcome)).count()
    }

    /// Number of reverted targets.
    #[must_use]
    pub fn reverted(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Reverted { .. }))
    }

    /// Number of skipped targets.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped { .. }))
    }

    /// Number of failed steps.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed { .. }))
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reverted, {} skipped, {} failed",
            self.reverted(),
            self.skipped(),
            self.failed()
        )
    }
}

enum Ownership {
    Ours,
    Gone,
    Modified(String),
}

/// Reverts a [`RunState`].
#[derive(Debug)]
pub struct Rollback<'a> {
    fs: &'a dyn FileSystemOps,
    paths: &'a PathResolver,
    backups: &'a BackupManager,
    dry_run: bool,
}

impl<'a> Rollback<'a> {
    /// Create a rollback over the given filesystem and backup store.
    #[must_use]
    pub const fn new(
        fs: &'a dyn FileSystemOps,
        paths: &'a PathResolver,
        backups: &'a BackupManager,
        dry_run: bool,
    ) -> Self {
        Self {
            fs,
            paths,
            backups,
            dry_run,
        }
    }

    /// Revert every changed result of `state`, newest first, then restore
    /// any backup of the run that no result accounts for.
    #[must_use]
    pub fn run(&self, state: &RunState) -> RollbackReport {
        let mut report = RollbackReport::default();
        for result in state.results.iter().rev().filter(|r| r.changed) {
            let outcome = self.revert(result, &state.backups);
            report.push(&result.target, outcome);
        }

        for entry in state.backups.iter().rev().filter(|b| {
            !state
                .results
                .iter()
                .any(|r| r.changed && r.backup_path.as_ref() == Some(&b.backup_path))
        }) {
            let outcome = self.restore_orphan(entry);
            report.push(&entry.original_path, outcome);
        }
        report
    }

    fn ownership(&self, result: &LinkResult) -> Result<Ownership, ResourceError> {
        let target = &result.target;
        let kind = self
            .fs
            .entry_kind(target)
            .map_err(|e| ResourceError::fs("inspect", target, e))?;
        Ok(match (result.kind, kind) {
            (_, EntryKind::Absent) => Ownership::Gone,
            (LinkKind::Symlink, EntryKind::Symlink) => {
                let current = self
                    .fs
                    .read_link(target)
                    .map_err(|e| ResourceError::fs("read link", target, e))?;
                if paths_equal(&resolve_link_destination(target, &current), &result.source) {
                    Ownership::Ours
                } else {
                    Ownership::Modified(format!("now points to {}", current.display()))
                }
            }
            (LinkKind::Sourceable, EntryKind::File) => {
                if contains_directive(&read_bytes(self.fs, target)?, &result.source) {
                    Ownership::Ours
                } else {
                    Ownership::Modified("source line was removed".to_string())
                }
            }
            (_, other) => Ownership::Modified(format!("now a {other:?}")),
        })
    }

    fn revert(&self, result: &LinkResult, backups: &[BackupEntry]) -> StepOutcome {
        let target = &result.target;
        let ours = match self.ownership(result) {
            Ok(Ownership::Ours) => true,
            Ok(Ownership::Gone) => false,
            Ok(Ownership::Modified(what)) => {
                return StepOutcome::Skipped {
                    reason: format!("target modified since run ({what})"),
                };
            }
            Err(e) => {
                return StepOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let detail = if let Some(previous) = &result.previous_link {
            format!("relinked to {}", previous.display())
        } else if let Some(backup) = &result.backup_path {
            format!("restored from {}", backup.display())
        } else {
            "removed".to_string()
        };
        if self.dry_run {
            return StepOutcome::Reverted { detail };
        }

        if ours && let Err(e) = self.fs.remove_file(target) {
            return StepOutcome::Failed {
                error: ResourceError::fs("remove", target, e).to_string(),
            };
        }

        let restored = if let Some(previous) = &result.previous_link {
            self.fs
                .symlink(previous, target)
                .map_err(|e| ResourceError::fs("recreate link", target, e))
        } else if let Some(backup_path) = &result.backup_path {
            let entry = backups
                .iter()
                .find(|b| &b.backup_path == backup_path)
                .cloned()
                .unwrap_or_else(|| BackupEntry {
                    id: backup_path.display().to_string(),
                    original_path: target.clone(),
                    backup_path: backup_path.clone(),
                    created_at: Utc::now(),
                });
            self.restore_and_drop(&entry)
        } else {
            Ok(())
        };

        match restored {
            Ok(()) => StepOutcome::Reverted { detail },
            Err(e) => StepOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    fn restore_orphan(&self, entry: &BackupEntry) -> StepOutcome {
        match self.fs.entry_kind(&entry.original_path) {
            Ok(EntryKind::Absent) => {}
            Ok(_) => {
                return StepOutcome::Skipped {
                    reason: "original path is occupied".to_string(),
                };
            }
            Err(e) => {
                return StepOutcome::Failed {
                    error: ResourceError::fs("inspect", &entry.original_path, e).to_string(),
                };
            }
        }
        let detail = format!("restored from {}", entry.backup_path.display());
        if self.dry_run {
            return StepOutcome::Reverted { detail };
        }
        match self.restore_and_drop(entry) {
            Ok(()) => StepOutcome::Reverted { detail },
            Err(e) => StepOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    /// Copy the backup back, then forget it; a backup that cannot be
    /// removed afterwards is left for `backup clean`.
    fn restore_and_drop(&self, entry: &BackupEntry) -> Result<(), ResourceError> {
        self.backups.restore(entry, self.paths, true)?;
        let _ = self.backups.remove(entry);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::SystemFileSystemOps;
    use crate::resources::reconcile::Reconciler;
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
            std::fs::create_dir_all(root.join("shell")).unwrap();
            std::fs::write(root.join("git/gitconfig"), "[user]\n").unwrap();
            std::fs::write(root.join("shell/vimrc"), "set nu\n").unwrap();
            std::fs::write(root.join("shell/zshrc"), "alias l=ls\n").unwrap();
            Self {
                _dir: dir,
                home,
                root,
            }
        }

        fn reconciler(&self) -> Reconciler {
            Reconciler::new(
                Arc::new(SystemFileSystemOps),
                PathResolver::new(&self.home, &self.root),
            )
            .force(true)
            .at(SystemTime::now() + Duration::from_secs(2 * 60 * 60))
        }

        fn run(&self, ctx: &Reconciler, entries: &[(&str, &str)]) -> RunState {
            let results = entries
                .iter()
                .map(|(s, t)| ctx.install(s, t, None))
                .collect();
            RunState::new("install", results, ctx.taken_backups())
        }

        fn rollback(&self, ctx: &Reconciler, state: &RunState, dry_run: bool) -> RollbackReport {
            Rollback::new(ctx.fs(), ctx.paths(), ctx.backups(), dry_run).run(state)
        }
    }

    #[cfg(unix)]
    #[test]
    fn rollback_restores_pre_run_state() {
        let fx = Fixture::new();
        std::fs::write(fx.home.join(".gitconfig"), "[user]\n\tname = mine\n").unwrap();
        std::fs::write(fx.home.join(".zshrc"), "export EDITOR=vim\n").unwrap();
        let ctx = fx.reconciler();

        let state = fx.run(
            &ctx,
            &[
                ("git/gitconfig", "~/.gitconfig"),
                ("shell/vimrc", "~/.vimrc"),
                ("shell/zshrc", "~/.zshrc"),
            ],
        );
        assert_eq!(state.backups.len(), 2);

        let report = fx.rollback(&ctx, &state, false);
        assert_eq!(report.failed(), 0, "{report:?}");
        assert_eq!(report.reverted(), 3);
        assert_eq!(report.steps[0].target, fx.home.join(".zshrc"));

        assert_eq!(
            std::fs::read_to_string(fx.home.join(".gitconfig")).unwrap(),
            "[user]\n\tname = mine\n"
        );
        assert!(!fx.home.join(".gitconfig").symlink_metadata().unwrap().is_symlink());
        assert!(fx.home.join(".vimrc").symlink_metadata().is_err());
        assert_eq!(
            std::fs::read_to_string(fx.home.join(".zshrc")).unwrap(),
            "export EDITOR=vim\n"
        );
        assert!(ctx.backups().list().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn rollback_recreates_replaced_repository_link() {
        let fx = Fixture::new();
        let other = fx.root.join("shell/vimrc");
        std::os::unix::fs::symlink(&other, fx.home.join(".gitconfig")).unwrap();
        let ctx = fx.reconciler();
        let state = fx.run(&ctx, &[("git/gitconfig", "~/.gitconfig")]);

        let report = fx.rollback(&ctx, &state, false);
        assert_eq!(report.reverted(), 1);
        assert_eq!(std::fs::read_link(fx.home.join(".gitconfig")).unwrap(), other);
    }

    #[cfg(unix)]
    #[test]
    fn rollback_skips_targets_modified_since_run() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        let state = fx.run(&ctx, &[("shell/vimrc", "~/.vimrc")]);
        std::fs::remove_file(fx.home.join(".vimrc")).unwrap();
        std::fs::write(fx.home.join(".vimrc"), "user rewrote this").unwrap();

        let report = fx.rollback(&ctx, &state, false);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            &report.steps[0].outcome,
            StepOutcome::Skipped { reason } if reason.contains("modified since run")
        ));
        assert_eq!(
            std::fs::read_to_string(fx.home.join(".vimrc")).unwrap(),
            "user rewrote this"
        );
    }

    #[cfg(unix)]
    #[test]
    fn unchanged_results_are_not_touched() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        fx.run(&ctx, &[("shell/vimrc", "~/.vimrc")]);
        let second = fx.run(&ctx, &[("shell/vimrc", "~/.vimrc")]);
        assert!(!second.has_changes());

        let report = fx.rollback(&ctx, &second, false);
        assert!(report.steps.is_empty());
        assert!(fx.home.join(".vimrc").symlink_metadata().unwrap().is_symlink());
    }

    #[cfg(unix)]
    #[test]
    fn dry_run_rollback_changes_nothing() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        let state = fx.run(&ctx, &[("shell/vimrc", "~/.vimrc")]);
        let report = fx.rollback(&ctx, &state, true);
        assert_eq!(report.reverted(), 1);
        assert!(fx.home.join(".vimrc").symlink_metadata().unwrap().is_symlink());
    }

    #[cfg(unix)]
    #[test]
    fn orphan_backup_is_restored_to_free_path() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        let original = fx.home.join(".bashrc");
        std::fs::write(&original, "export PATH\n").unwrap();
        let entry = ctx.backups().backup(&original).unwrap();
        std::fs::remove_file(&original).unwrap();
        let state = RunState::new("install", Vec::new(), vec![entry.clone()]);

        let report = fx.rollback(&ctx, &state, false);
        assert_eq!(report.reverted(), 1, "{report:?}");
        assert_eq!(report.steps[0].target, original);
        assert_eq!(std::fs::read_to_string(&original).unwrap(), "export PATH\n");
        assert!(!entry.backup_path.exists());
        assert!(ctx.backups().list().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn orphan_backup_is_kept_when_path_is_occupied() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        let original = fx.home.join(".bashrc");
        std::fs::write(&original, "old\n").unwrap();
        let entry = ctx.backups().backup(&original).unwrap();
        std::fs::write(&original, "new\n").unwrap();
        let state = RunState::new("install", Vec::new(), vec![entry.clone()]);

        let report = fx.rollback(&ctx, &state, false);
        assert_eq!(report.skipped(), 1, "{report:?}");
        assert!(matches!(
            &report.steps[0].outcome,
            StepOutcome::Skipped { reason } if reason.contains("occupied")
        ));
        assert_eq!(std::fs::read_to_string(&original).unwrap(), "new\n");
        assert_eq!(ctx.backups().list().unwrap(), vec![entry]);
    }

    #[test]
    fn report_display() {
        let mut report = RollbackReport::default();
        report.push(
            Path::new("/a"),
            StepOutcome::Reverted {
                detail: "removed".into(),
            },
        );
        report.push(
            Path::new("/b"),
            StepOutcome::Failed {
                error: "denied".into(),
            },
        );
        assert_eq!(report.to_string(), "1 reverted, 0 skipped, 1 failed");
    }
}
