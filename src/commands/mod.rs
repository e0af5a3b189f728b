//! Subcommand orchestration: setup, task execution, reports and exit policy.
pub mod backup;
pub mod install;
pub mod link;
pub mod rollback;
pub mod status;
pub mod unlink;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{CONFIG_FILE, Config};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger, print_link_report};
use crate::operations::SystemFileSystemOps;
use crate::platform::Platform;
use crate::resources::report::{LinkResult, RunSummary};
use crate::resources::state::{RunState, StateStore};
use crate::tasks::{self, Context, Task};

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates root resolution, platform detection and configuration
/// loading so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform (OS and home directory).
    pub platform: Platform,
    /// Loaded configuration.
    pub config: Config,
}

impl CommandSetup {
    /// Resolve the repository root, detect the platform, and load
    /// `dotfiles.toml`. Validation warnings are logged, never fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory or home directory cannot be
    /// determined, or the configuration fails to load.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let platform = Platform::detect()?;
        let root = resolve_root(global)?;
        log.debug(&format!("root: {}", root.display()));
        log.debug(&format!("home: {}", platform.home.display()));
        if platform.is_windows() {
            log.debug("symlinks need Developer Mode or an elevated shell on Windows");
        }

        log.stage("Loading configuration");
        let config = Config::load(&root)
            .with_context(|| format!("failed to load {}", root.join(CONFIG_FILE).display()))?;

        log.debug(&format!("{} directories", config.directories.len()));
        log.debug(&format!("{} templates", config.templates.len()));
        log.debug(&format!("{} shell commands", config.shell_commands.len()));
        log.info(&format!(
            "loaded {} symlinks on {}",
            config.symlinks.len(),
            platform.os
        ));

        let warnings = config.validate();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        Ok(Self { platform, config })
    }

    /// Build the task context on the real filesystem and process runner.
    #[must_use]
    pub fn context(self, global: &GlobalOpts, log: &Arc<Logger>) -> Context {
        let shared: Arc<dyn Log> = log.clone();
        Context::new(
            Arc::new(self.config),
            Arc::new(self.platform),
            shared,
            Arc::new(SystemExecutor),
            Arc::new(SystemFileSystemOps),
            global.dry_run,
            global.force,
        )
    }
}

/// Resolve the dotfiles root directory from CLI arguments or auto-detection.
///
/// Order: `--root`, `DOTFILES_ROOT`, the directory the binary was built or
/// installed from, then the current directory. Auto-detected candidates must
/// contain `dotfiles.toml`.
///
/// # Errors
///
/// Returns an error if no candidate qualifies.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(ref root) = global.root {
        return Ok(root.clone());
    }

    if let Some(root) = std::env::var_os("DOTFILES_ROOT").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        let candidates = [
            parent.join("../.."), // target/release/ → repo root
            parent.join(".."),    // bin/ → repo root
        ];
        for candidate in &candidates {
            if candidate.join(CONFIG_FILE).is_file() {
                return Ok(dunce::canonicalize(candidate)?);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    if cwd.join(CONFIG_FILE).is_file() {
        return Ok(cwd);
    }

    anyhow::bail!(
        "cannot determine dotfiles root (no {CONFIG_FILE} found). Use --root or set DOTFILES_ROOT"
    );
}

/// Execute `tasks` in order, persist the run state, print the reports and
/// apply the exit policy.
///
/// The state file is written only for a real run that reconciled at least
/// one entry, so a run that skipped the link task keeps the previous
/// rollback generation.
///
/// # Errors
///
/// Returns an error if the state cannot be saved, or the exit policy calls
/// for a non-zero exit.
pub fn run_linking<'a>(
    command: &str,
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
    strict: bool,
) -> Result<()> {
    for task in tasks {
        tasks::execute(task, ctx);
    }

    let results = ctx.link_results();
    if !ctx.dry_run && !results.is_empty() {
        let store = StateStore::new(Arc::clone(&ctx.fs_ops), ctx.home());
        let state = RunState::new(command, results.clone(), ctx.reconciler.taken_backups());
        store
            .save(&state)
            .with_context(|| format!("failed to save run state to {}", store.path().display()))?;
        log.debug(&format!("run state saved to {}", store.path().display()));
    }

    print_link_report(log, &results, ctx.paths());
    log.print_summary();
    check_exit(log, &results, strict)
}

/// Execute `tasks` in order and print the task summary, without touching the
/// run state.
///
/// # Errors
///
/// Returns an error if one or more tasks recorded a failure.
pub fn run_tasks_to_completion<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    for task in tasks {
        tasks::execute(task, ctx);
    }

    log.print_summary();
    check_exit(log, &[], false)
}

/// Non-zero exit when a task failed, an entry failed, or (with `strict`) a
/// conflict remains.
///
/// # Errors
///
/// Returns an error describing the first rule that applies.
pub fn check_exit(log: &Logger, results: &[LinkResult], strict: bool) -> Result<()> {
    let summary = RunSummary::from_results(results);
    if summary.failed > 0 {
        anyhow::bail!("{} entries failed", summary.failed);
    }
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    if strict && summary.conflicts > 0 {
        anyhow::bail!("{} unresolved conflict(s) (--strict)", summary.conflicts);
    }
    Ok(())
}
