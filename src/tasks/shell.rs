use anyhow::{Result, bail};

use super::{Context, Outcome, Task, TaskResult, TaskStats};

/// Run `[[shell_commands]]` with `sh -c` from the repository root.
#[derive(Debug)]
pub struct RunShellCommands;

impl Task for RunShellCommands {
    fn name(&self) -> &'static str {
        "Run shell commands"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.shell_commands.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !ctx.executor.which("sh") {
            return Ok(TaskResult::Skipped("sh not found on PATH".to_string()));
        }

        let mut stats = TaskStats::new();
        let mut failed = Vec::new();
        for cmd in &ctx.config.shell_commands {
            let label = if cmd.description.is_empty() {
                cmd.command.as_str()
            } else {
                cmd.description.as_str()
            };
            if ctx.dry_run {
                ctx.log.dry_run(&format!("would run: {}", cmd.command));
                stats.record(Outcome::Changed);
                continue;
            }
            ctx.log.debug(&format!("sh -c {}", cmd.command));
            match ctx.executor.shell(ctx.root(), &cmd.command) {
                Ok(_) => {
                    ctx.log.info(&format!("ran: {label}"));
                    stats.record(Outcome::Changed);
                }
                Err(e) => {
                    ctx.log.error(&format!("{label}: {e:#}"));
                    failed.push(label.to_string());
                }
            }
        }

        if !failed.is_empty() {
            bail!("{} command(s) failed: {}", failed.len(), failed.join(", "));
        }
        Ok(stats.finish(ctx))
    }
}
