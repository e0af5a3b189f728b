use anyhow::{Result, bail};

use super::{Context, Outcome, Task, TaskResult, TaskStats};
use crate::logging::{entry_line, log_entry};
use crate::resources::ResourceChange;
use crate::resources::report::RunSummary;

/// Reconcile every `[[symlinks]]` entry in declaration order.
///
/// Sourceable targets (`.zshrc`, ...) get a `source` line; everything else a
/// symlink. Per-entry problems are recorded on the context and never stop the
/// loop; the task fails afterwards if any entry failed.
#[derive(Debug)]
pub struct InstallLinks;

impl Task for InstallLinks {
    fn name(&self) -> &'static str {
        "Install links"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.symlinks.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let mut results = Vec::with_capacity(ctx.config.symlinks.len());
        for link in &ctx.config.symlinks {
            let result = ctx
                .reconciler
                .install(&link.source, &link.target, link.force);
            if ctx.dry_run && result.changed {
                ctx.log.dry_run(&entry_line(&result, ctx.paths()));
            } else {
                log_entry(&*ctx.log, &result, ctx.paths());
            }
            results.push(result);
        }

        let summary = RunSummary::from_results(&results);
        ctx.log.info(&summary.to_string());
        ctx.record_results(results);

        if summary.failed > 0 {
            bail!("{} of {} entries failed", summary.failed, summary.total());
        }
        Ok(if ctx.dry_run {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        })
    }
}

/// Remove the links `InstallLinks` created, leaving anything else in place.
#[derive(Debug)]
pub struct RemoveLinks;

impl Task for RemoveLinks {
    fn name(&self) -> &'static str {
        "Remove links"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.symlinks.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let mut stats = TaskStats::new();
        let mut failed = 0u32;

        for link in &ctx.config.symlinks {
            let target = ctx.paths().contract(&ctx.resolve_target(&link.target));
            match ctx.reconciler.uninstall(&link.source, &link.target) {
                Ok(ResourceChange::Applied) => {
                    if ctx.dry_run {
                        ctx.log.dry_run(&format!("would unlink {target}"));
                    } else {
                        ctx.log.info(&format!("unlinked {target}"));
                    }
                    stats.record(Outcome::Changed);
                }
                Ok(ResourceChange::AlreadyCorrect) => {
                    ctx.log.debug(&format!("ok: {target} (not linked)"));
                    stats.record(Outcome::AlreadyOk);
                }
                Ok(ResourceChange::Skipped { reason }) => {
                    ctx.log.debug(&format!("left alone: {target} ({reason})"));
                    stats.record(Outcome::Skipped);
                }
                Err(e) => {
                    ctx.log.error(&format!("failed to unlink {target}: {e}"));
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            ctx.log.info(&stats.summary(ctx.dry_run));
            bail!("{failed} entries could not be unlinked");
        }
        Ok(stats.finish(ctx))
    }
}
