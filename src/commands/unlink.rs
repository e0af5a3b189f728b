//! Unlink command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::tasks;

/// Run the unlink command.
///
/// The persisted run state is left alone; unlinking is not a run that
/// rollback can undo.
///
/// # Errors
///
/// Returns an error if configuration loading fails or a link could not be
/// removed.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let ctx = super::CommandSetup::init(global, log)?.context(global, log);
    let tasks = tasks::unlink_tasks();
    super::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, log)
}
