//! Task bookkeeping and the [`Log`] trait.
use std::fmt;

/// Outcome of one task, kept for the end-of-run summary.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    /// Task name as shown in the summary (`Install links`, ...).
    pub name: String,
    /// How the task ended.
    pub status: TaskStatus,
    /// Skip reason or error text.
    pub message: Option<String>,
}

impl TaskEntry {
    /// Summary line: glyph, name and the optional message in parentheses.
    #[must_use]
    pub fn line(&self) -> String {
        let (glyph, color) = self.status.style();
        match &self.message {
            Some(msg) => format!("{color}{glyph} {} ({msg})\x1b[0m", self.name),
            None => format!("{color}{glyph} {}\x1b[0m", self.name),
        }
    }
}

/// How a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Ran and applied whatever was needed.
    Ok,
    /// Nothing of this kind is configured.
    NotApplicable,
    /// Skipped by `--skip`/`--only` or a missing tool.
    Skipped,
    /// Planned only.
    DryRun,
    /// Errored, or at least one of its entries failed.
    Failed,
}

impl TaskStatus {
    /// Glyph and ANSI color used in the summary.
    #[must_use]
    pub const fn style(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::NotApplicable => ("·", "\x1b[2m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::DryRun => ("~", "\x1b[37m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}

/// Per-status counts over a list of recorded tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskTally {
    /// Tasks that finished [`TaskStatus::Ok`].
    pub ok: usize,
    /// Tasks with nothing configured.
    pub not_applicable: usize,
    /// Skipped tasks.
    pub skipped: usize,
    /// Tasks that only planned.
    pub dry_run: usize,
    /// Failed tasks.
    pub failed: usize,
}

impl TaskTally {
    /// Count `entries` by status.
    #[must_use]
    pub fn from_entries(entries: &[TaskEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut tally, entry| {
            match entry.status {
                TaskStatus::Ok => tally.ok += 1,
                TaskStatus::NotApplicable => tally.not_applicable += 1,
                TaskStatus::Skipped => tally.skipped += 1,
                TaskStatus::DryRun => tally.dry_run += 1,
                TaskStatus::Failed => tally.failed += 1,
            }
            tally
        })
    }

    /// Number of tasks counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.not_applicable + self.skipped + self.dry_run + self.failed
    }
}

impl fmt::Display for TaskTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tasks: \x1b[32m{} ok\x1b[0m, \x1b[2m{} n/a\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[37m{} dry-run\x1b[0m, \x1b[31m{} failed\x1b[0m",
            self.total(),
            self.ok,
            self.not_applicable,
            self.skipped,
            self.dry_run,
            self.failed
        )
    }
}

/// Sink for everything tasks and the reconciler report.
///
/// Everything below the CLI logs through `&dyn Log`, so tests can pass a
/// logger of their own.
pub trait Log: Send + Sync {
    /// Section header.
    fn stage(&self, msg: &str);
    /// Normal progress line.
    fn info(&self, msg: &str);
    /// Detail shown on the console only with `--verbose`.
    fn debug(&self, msg: &str);
    /// Something the user should look at.
    fn warn(&self, msg: &str);
    /// Something failed.
    fn error(&self, msg: &str);
    /// A change that would have been made without `--dry-run`.
    fn dry_run(&self, msg: &str);
    /// Remember how a task ended.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}
