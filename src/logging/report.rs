//! Human-readable rendering of link and rollback outcomes.
use crate::resources::paths::PathResolver;
use crate::resources::report::{LinkResult, LinkStatus, RunSummary};
use crate::resources::rollback::{RollbackReport, StepOutcome};

use super::types::Log;

/// One status line for a reconciled entry, e.g.
/// `linked ~/.gitconfig -> git/gitconfig (backed up to ...)`.
#[must_use]
pub fn entry_line(result: &LinkResult, paths: &PathResolver) -> String {
    let verb = match result.status {
        LinkStatus::Linked if result.changed && result.backup_path.is_some() => "backed up",
        LinkStatus::Linked if result.changed => "linked",
        LinkStatus::Linked => "ok",
        LinkStatus::Skipped => "skipped",
        LinkStatus::Conflict => "conflict",
        LinkStatus::SourceMissing => "source missing",
        LinkStatus::Failed => "failed",
    };
    let mut line = format!(
        "{verb:<14} {} -> {}",
        paths.contract(&result.target),
        paths.contract(&result.source)
    );
    if let Some(message) = &result.message {
        line.push_str(&format!(" ({message})"));
    }
    if let Some(backup) = &result.backup_path {
        line.push_str(&format!(" [backup: {}]", paths.contract(backup)));
    }
    line
}

/// Log every entry at a level matching its status.
pub fn log_entry(log: &dyn Log, result: &LinkResult, paths: &PathResolver) {
    let line = entry_line(result, paths);
    match result.status {
        LinkStatus::Failed => log.error(&line),
        LinkStatus::Conflict | LinkStatus::SourceMissing => log.warn(&line),
        LinkStatus::Linked if result.changed => log.info(&line),
        LinkStatus::Linked | LinkStatus::Skipped => log.debug(&line),
    }
}

/// Print the link summary counts followed by the itemized conflicts and
/// failures.
pub fn print_link_report(log: &dyn Log, results: &[LinkResult], paths: &PathResolver) {
    if results.is_empty() {
        return;
    }
    let summary = RunSummary::from_results(results);

    println!();
    log.stage("Links");
    log.info(&format!("{:<16}{}", "linked", summary.linked));
    log.info(&format!("{:<16}{}", "already ok", summary.unchanged));
    log.info(&format!("{:<16}{}", "conflict", summary.conflicts));
    log.info(&format!("{:<16}{}", "source missing", summary.source_missing));
    log.info(&format!("{:<16}{}", "skipped", summary.skipped));
    log.info(&format!("{:<16}{}", "failed", summary.failed));
    log.info(&format!("{:<16}{}", "backups", summary.backups));
    if !summary.has_problems() {
        return;
    }

    let problems: Vec<&LinkResult> = results
        .iter()
        .filter(|r| {
            matches!(
                r.status,
                LinkStatus::Conflict | LinkStatus::SourceMissing | LinkStatus::Failed
            )
        })
        .collect();
    println!();
    for result in problems {
        log_entry(log, result, paths);
    }
    if summary.conflicts > 0 {
        log.info("conflicting targets were left untouched; move them aside or rerun with --force");
    }
}

/// Log each rollback step and the totals.
pub fn print_rollback_report(log: &dyn Log, report: &RollbackReport, paths: &PathResolver) {
    for step in &report.steps {
        let target = paths.contract(&step.target);
        match &step.outcome {
            StepOutcome::Reverted { detail } => log.info(&format!("reverted {target} ({detail})")),
            StepOutcome::Skipped { reason } => log.warn(&format!("skipped {target} ({reason})")),
            StepOutcome::Failed { error } => log.error(&format!("failed {target}: {error}")),
        }
    }
    log.info(&report.to_string());
}
