//! Install command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::Logger;
use crate::tasks;

/// Run the install command: directories, links, templates and shell
/// commands, filtered by `--skip` and `--only`.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the run state cannot be
/// saved, or the exit policy calls for a non-zero exit.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    let version = super::version::version();
    log.info(&format!("dotfiles {version}"));

    let ctx = super::CommandSetup::init(global, log)?.context(global, log);
    let all_tasks = tasks::install_tasks();
    let selected = tasks::filter_tasks(&all_tasks, &opts.skip, &opts.only);
    if selected.is_empty() {
        log.warn("no tasks match --skip/--only");
    }
    super::run_linking("install", selected, &ctx, log, global.strict)
}
