use anyhow::{Context as _, Result};

use super::context::Context;
use crate::resources::{Resource, ResourceChange, ResourceState};

/// How a task finished when it did not fail.
///
/// # Examples
///
/// ```
/// use dotfiles_manager::tasks::TaskResult;
///
/// let skipped = TaskResult::Skipped("sh not found on PATH".into());
/// assert!(matches!(skipped, TaskResult::Skipped(_)));
/// ```
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Changes were applied, or none were needed.
    Ok,
    /// Nothing was attempted; the reason is shown in the summary.
    Skipped(String),
    /// Changes were only planned.
    DryRun,
}

/// What happened to one item a task processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Created, removed, or (in a dry run) would be.
    Changed,
    /// Already in the desired state.
    AlreadyOk,
    /// Left alone.
    Skipped,
}

/// Per-task counters, logged as one line when the task ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Items changed.
    pub changed: u32,
    /// Items that needed nothing.
    pub already_ok: u32,
    /// Items left alone.
    pub skipped: u32,
}

impl TaskStats {
    /// All counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one item.
    pub const fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Changed => self.changed += 1,
            Outcome::AlreadyOk => self.already_ok += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    /// `3 changed, 10 already ok`, with `, 1 skipped` appended when needed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotfiles_manager::tasks::TaskStats;
    ///
    /// let stats = TaskStats { changed: 2, already_ok: 5, skipped: 1 };
    /// assert_eq!(stats.summary(false), "2 changed, 5 already ok, 1 skipped");
    /// assert_eq!(stats.summary(true), "2 would change, 5 already ok, 1 skipped");
    /// ```
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut line = format!("{} {verb}, {} already ok", self.changed, self.already_ok);
        if self.skipped > 0 {
            line.push_str(&format!(", {} skipped", self.skipped));
        }
        line
    }

    /// Log the summary line and end the task as `Ok` or `DryRun`.
    #[must_use]
    pub fn finish(self, ctx: &Context) -> TaskResult {
        ctx.log.info(&self.summary(ctx.dry_run));
        if ctx.dry_run {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        }
    }
}

/// Bring each resource to its desired state, in order.
///
/// `verb` names the action in log lines (`create ~/.local/bin`). In a dry run
/// missing resources are only reported.
///
/// # Errors
///
/// Stops at the first resource whose state cannot be read or whose apply
/// fails.
pub fn process_resources<R: Resource>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    verb: &str,
) -> Result<TaskResult> {
    let mut stats = TaskStats::new();
    for resource in resources {
        stats.record(step(ctx, &resource, verb)?);
    }
    Ok(stats.finish(ctx))
}

fn step<R: Resource>(ctx: &Context, resource: &R, verb: &str) -> Result<Outcome> {
    let desc = resource.description();
    match resource.current_state()? {
        ResourceState::Correct => {
            ctx.log.debug(&format!("ok: {desc}"));
            Ok(Outcome::AlreadyOk)
        }
        ResourceState::Invalid { reason } => {
            ctx.log.warn(&format!("skipping {desc}: {reason}"));
            Ok(Outcome::Skipped)
        }
        ResourceState::Missing if ctx.dry_run => {
            ctx.log.dry_run(&format!("would {verb} {desc}"));
            Ok(Outcome::Changed)
        }
        ResourceState::Missing => {
            let change = resource
                .apply()
                .with_context(|| format!("failed to {verb} {desc}"))?;
            Ok(match change {
                ResourceChange::Applied => {
                    ctx.log.info(&format!("{verb} {desc}"));
                    Outcome::Changed
                }
                ResourceChange::AlreadyCorrect => Outcome::AlreadyOk,
                ResourceChange::Skipped { reason } => {
                    ctx.log.warn(&format!("skipped {desc}: {reason}"));
                    Outcome::Skipped
                }
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::tasks::test_helpers::{empty_config, make_context};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resource with a fixed state and a scripted apply.
    struct FakeDir {
        state: ResourceState,
        apply_result: Result<ResourceChange, String>,
        applied: AtomicUsize,
    }

    impl FakeDir {
        fn new(state: ResourceState) -> Self {
            Self {
                state,
                apply_result: Ok(ResourceChange::Applied),
                applied: AtomicUsize::new(0),
            }
        }

        fn failing(state: ResourceState, msg: &str) -> Self {
            Self {
                apply_result: Err(msg.to_string()),
                ..Self::new(state)
            }
        }

        fn applied(&self) -> usize {
            self.applied.load(Ordering::SeqCst)
        }
    }

    impl Resource for FakeDir {
        fn description(&self) -> String {
            "~/.local/bin".to_string()
        }

        fn current_state(&self) -> Result<ResourceState> {
            Ok(self.state.clone())
        }

        fn apply(&self) -> Result<ResourceChange> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            self.apply_result
                .clone()
                .map_err(|s| anyhow::anyhow!("{s}"))
        }
    }

    // lets a test inspect resources after handing them to process_resources
    impl Resource for &FakeDir {
        fn description(&self) -> String {
            (**self).description()
        }

        fn current_state(&self) -> Result<ResourceState> {
            (**self).current_state()
        }

        fn apply(&self) -> Result<ResourceChange> {
            (**self).apply()
        }
    }

    fn context(dry_run: bool) -> Context {
        let mut ctx = make_context(empty_config(PathBuf::from("/tmp")));
        ctx.dry_run = dry_run;
        ctx
    }

    #[test]
    fn summary_omits_zero_skipped() {
        let stats = TaskStats {
            changed: 1,
            already_ok: 2,
            skipped: 0,
        };
        assert_eq!(stats.summary(false), "1 changed, 2 already ok");
    }

    #[test]
    fn record_counts_each_outcome() {
        let mut stats = TaskStats::new();
        stats.record(Outcome::Changed);
        stats.record(Outcome::Changed);
        stats.record(Outcome::AlreadyOk);
        stats.record(Outcome::Skipped);
        assert_eq!(
            stats,
            TaskStats {
                changed: 2,
                already_ok: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn finish_follows_dry_run() {
        assert!(matches!(TaskStats::new().finish(&context(true)), TaskResult::DryRun));
        assert!(matches!(TaskStats::new().finish(&context(false)), TaskResult::Ok));
    }

    #[test]
    fn correct_resource_is_left_alone() {
        let r = FakeDir::new(ResourceState::Correct);
        assert_eq!(step(&context(false), &r, "create").unwrap(), Outcome::AlreadyOk);
        assert_eq!(r.applied(), 0);
    }

    #[test]
    fn invalid_resource_is_skipped() {
        let r = FakeDir::new(ResourceState::Invalid {
            reason: "a file is in the way".into(),
        });
        assert_eq!(step(&context(false), &r, "create").unwrap(), Outcome::Skipped);
        assert_eq!(r.applied(), 0);
    }

    #[test]
    fn missing_resource_is_applied() {
        let r = FakeDir::new(ResourceState::Missing);
        assert_eq!(step(&context(false), &r, "create").unwrap(), Outcome::Changed);
        assert_eq!(r.applied(), 1);
    }

    #[test]
    fn dry_run_reports_without_applying() {
        let r = FakeDir::failing(ResourceState::Missing, "must not run");
        assert_eq!(step(&context(true), &r, "create").unwrap(), Outcome::Changed);
        assert_eq!(r.applied(), 0);
    }

    #[test]
    fn apply_error_stops_processing() {
        let first = FakeDir::failing(ResourceState::Missing, "permission denied");
        let second = FakeDir::new(ResourceState::Missing);
        let err = process_resources(&context(false), [&first, &second], "create").unwrap_err();
        assert!(format!("{err:#}").contains("permission denied"), "{err:#}");
        assert_eq!(second.applied(), 0);
    }

    #[test]
    fn skipped_change_is_counted_as_skipped() {
        let r = FakeDir {
            apply_result: Ok(ResourceChange::Skipped {
                reason: "created concurrently".into(),
            }),
            ..FakeDir::new(ResourceState::Missing)
        };
        assert_eq!(step(&context(false), &r, "create").unwrap(), Outcome::Skipped);
    }
}
