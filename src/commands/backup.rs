//! Backup command: list, restore and prune stored backups.
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;

use crate::cli::{BackupCommand, CleanOpts, GlobalOpts, RestoreOpts};
use crate::logging::Logger;
use crate::resources::backup::{BackupEntry, RetentionPolicy};
use crate::resources::paths::PathResolver;
use crate::tasks::Context;

/// Run a `backup` subcommand.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the backup store
/// cannot be read or rewritten, a restore fails, or `clean` leaves backups
/// it could not delete.
pub fn run(global: &GlobalOpts, command: &BackupCommand, log: &Arc<Logger>) -> Result<()> {
    let ctx = super::CommandSetup::init(global, log)?.context(global, log);
    match command {
        BackupCommand::List => list(&ctx),
        BackupCommand::Restore(opts) => restore(&ctx, opts),
        BackupCommand::Clean(opts) => clean(&ctx, opts),
    }
}

/// One listing line: id, original path and creation time.
#[must_use]
pub fn entry_line(entry: &BackupEntry, paths: &PathResolver) -> String {
    format!(
        "{:<30} {:<32} {}",
        entry.id,
        paths.contract(&entry.original_path),
        entry.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn list(ctx: &Context) -> Result<()> {
    let backups = ctx.reconciler.backups();
    ctx.log.stage("Backups");
    let entries = backups.list()?;
    if entries.is_empty() {
        ctx.log.info(&format!(
            "no backups under {}",
            ctx.paths().contract(backups.root())
        ));
        return Ok(());
    }
    for entry in &entries {
        ctx.log.info(&entry_line(entry, ctx.paths()));
    }
    ctx.log.info(&format!("{} backup(s)", entries.len()));
    Ok(())
}

fn restore(ctx: &Context, opts: &RestoreOpts) -> Result<()> {
    let backups = ctx.reconciler.backups();
    ctx.log.stage("Restoring backup");
    let entry = backups.find(&opts.id)?;
    let original = ctx.paths().contract(&entry.original_path);
    if ctx.dry_run {
        ctx.log
            .dry_run(&format!("would restore {original} from backup {}", entry.id));
        return Ok(());
    }
    backups.restore(&entry, ctx.paths(), opts.overwrite)?;
    ctx.log
        .info(&format!("restored {original} from backup {}", entry.id));
    Ok(())
}

/// Retention limits: command-line values override `[backup]`.
#[must_use]
pub fn policy(ctx: &Context, opts: &CleanOpts) -> RetentionPolicy {
    let configured = ctx.config.retention();
    RetentionPolicy {
        max_age_days: opts.max_age_days.unwrap_or(configured.max_age_days),
        max_count: opts.max_count.unwrap_or(configured.max_count),
    }
}

fn clean(ctx: &Context, opts: &CleanOpts) -> Result<()> {
    let policy = policy(ctx, opts);
    ctx.log.stage("Cleaning backups");
    ctx.log.debug(&format!(
        "keeping backups newer than {} days, at most {} per file",
        policy.max_age_days, policy.max_count
    ));

    let report = ctx
        .reconciler
        .backups()
        .clean(policy, Utc::now(), ctx.dry_run)?;
    for entry in &report.removed {
        let line = entry_line(entry, ctx.paths());
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would remove {line}"));
        } else {
            ctx.log.info(&format!("removed {line}"));
        }
    }
    for (entry, error) in &report.failed {
        let line = entry_line(entry, ctx.paths());
        ctx.log.error(&format!("could not remove {line}: {error}"));
    }
    let verb = if ctx.dry_run { "would remove" } else { "removed" };
    ctx.log.info(&format!("{verb} {} backup(s)", report.removed.len()));
    if !report.failed.is_empty() {
        bail!("{} backup(s) could not be removed", report.failed.len());
    }
    Ok(())
}
