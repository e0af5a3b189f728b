//! Named units of work run in order by the `install`, `link` and `unlink`
//! commands.
pub mod context;
pub mod directories;
mod processing;
pub mod shell;
pub mod symlinks;
pub mod templates;

pub use context::Context;
pub use processing::{Outcome, TaskResult, TaskStats, process_resources};

use anyhow::Result;

use crate::logging::TaskStatus;

/// A named, executable task.
pub trait Task: Send + Sync {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether this task has anything to do for the loaded configuration.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task fails, e.g. a directory cannot be created
    /// or one of its entries ended in failure.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Tasks run by `install`, in execution order.
#[must_use]
pub fn install_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(directories::CreateDirectories),
        Box::new(symlinks::InstallLinks),
        Box::new(templates::GenerateTemplates),
        Box::new(shell::RunShellCommands),
    ]
}

/// Tasks run by `link`: directories and links only.
#[must_use]
pub fn link_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(directories::CreateDirectories),
        Box::new(symlinks::InstallLinks),
    ]
}

/// Tasks run by `unlink`.
#[must_use]
pub fn unlink_tasks() -> Vec<Box<dyn Task>> {
    vec![Box::new(symlinks::RemoveLinks)]
}

/// Keep the tasks selected by `--only` (if any), minus those named by
/// `--skip`. Names match case-insensitively on substrings, so `--only links`
/// selects "Install links".
#[must_use]
pub fn filter_tasks<'a>(
    tasks: &'a [Box<dyn Task>],
    skip: &[String],
    only: &[String],
) -> Vec<&'a dyn Task> {
    let matches = |name: &str, patterns: &[String]| {
        patterns
            .iter()
            .any(|p| name.contains(&p.to_lowercase()))
    };
    tasks
        .iter()
        .filter(|t| {
            let name = t.name().to_lowercase();
            (only.is_empty() || matches(&name, only)) && !matches(&name, skip)
        })
        .map(AsRef::as_ref)
        .collect()
}

/// Execute a task, recording the result in the logger.
pub fn execute(task: &dyn Task, ctx: &Context) {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (nothing configured)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return;
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
        }
    }
}
