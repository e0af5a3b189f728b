//! Rollback command: undo the most recent recorded run.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::logging::{Logger, print_rollback_report};
use crate::resources::rollback::{Rollback, RollbackReport};
use crate::resources::state::StateStore;
use crate::tasks::Context;

/// Revert the persisted run and, when every step succeeded, remove the state
/// file. Returns `None` when no run is recorded.
///
/// # Errors
///
/// Returns an error if the state file cannot be read or removed.
pub fn roll_back(ctx: &Context) -> Result<Option<RollbackReport>> {
    let store = StateStore::new(Arc::clone(&ctx.fs_ops), ctx.home());
    let Some(state) = store
        .load()
        .with_context(|| format!("failed to read {}", store.path().display()))?
    else {
        return Ok(None);
    };

    ctx.log.info(&format!(
        "reverting {} run from {}",
        state.command,
        state.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !state.has_changes() {
        ctx.log.info("the recorded run changed nothing");
    }
    let report = Rollback::new(
        ctx.reconciler.fs(),
        ctx.paths(),
        ctx.reconciler.backups(),
        ctx.dry_run,
    )
    .run(&state);

    if report.failed() == 0 {
        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would remove {}", store.path().display()));
        } else {
            store
                .clear()
                .with_context(|| format!("failed to remove {}", store.path().display()))?;
        }
    }
    Ok(Some(report))
}

/// Run the rollback command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the state file cannot be
/// handled, or any step failed (the state file is then kept for a retry).
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let ctx = super::CommandSetup::init(global, log)?.context(global, log);

    log.stage("Rolling back");
    let Some(report) = roll_back(&ctx)? else {
        log.info("nothing to roll back: no recorded run");
        return Ok(());
    };
    print_rollback_report(&**log, &report, ctx.paths());

    if report.failed() > 0 {
        anyhow::bail!(
            "{} rollback step(s) failed; run state kept for another attempt",
            report.failed()
        );
    }
    Ok(())
}
