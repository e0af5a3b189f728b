//! The [`Logger`]: tracing front end plus task bookkeeping.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, TaskEntry, TaskStatus, TaskTally};
use super::utils::log_file_path;

/// Front end for every message the CLI prints.
///
/// Messages become `tracing` events; the subscriber from
/// [`init_subscriber`](super::subscriber::init_subscriber) decides where
/// they go. Task outcomes are kept in memory for [`Logger::print_summary`].
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for one invocation of `command`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Where the file layer writes, shown at the end of the summary.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Snapshot of the recorded tasks.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.tasks.lock().map_or_else(|_| Vec::new(), |g| g.clone())
    }

    /// Number of tasks recorded as [`TaskStatus::Failed`].
    #[must_use]
    pub fn failure_count(&self) -> usize {
        TaskTally::from_entries(&self.task_entries()).failed
    }

    /// Section header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Normal progress line.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Verbose-only on the console; always in the log file.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Warning, printed to stderr.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Error, printed to stderr.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Planned change under `--dry-run`.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Remember how a task ended.
    pub fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// One line per recorded task, then the per-status counts and the log
    /// file location. Prints nothing when no task ran.
    pub fn print_summary(&self) {
        let tasks = self.task_entries();
        if tasks.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");
        for task in &tasks {
            self.info(&task.line());
        }

        println!();
        self.info(&TaskTally::from_entries(&tasks).to_string());
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        Self::stage(self, msg);
    }

    fn info(&self, msg: &str) {
        Self::info(self, msg);
    }

    fn debug(&self, msg: &str) {
        Self::debug(self, msg);
    }

    fn warn(&self, msg: &str) {
        Self::warn(self, msg);
    }

    fn error(&self, msg: &str) {
        Self::error(self, msg);
    }

    fn dry_run(&self, msg: &str) {
        Self::dry_run(self, msg);
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        Self::record_task(self, name, status, message);
    }
}
