//! Link command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::tasks;

/// Run the link command: create directories and reconcile links only.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the run state cannot be
/// saved, or the exit policy calls for a non-zero exit.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let ctx = super::CommandSetup::init(global, log)?.context(global, log);
    let tasks = tasks::link_tasks();
    super::run_linking("link", tasks.iter().map(Box::as_ref), &ctx, log, global.strict)
}
