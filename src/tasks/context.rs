use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;
use crate::operations::FileSystemOps;
use crate::platform::Platform;
use crate::resources::paths::PathResolver;
use crate::resources::reconcile::Reconciler;
use crate::resources::report::LinkResult;

/// Shared context for task execution.
pub struct Context {
    /// Configuration loaded from `dotfiles.toml`.
    pub config: Arc<Config>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Run-level overwrite permission (`--force` or `[defaults] force`).
    pub force: bool,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Filesystem operation abstraction (injectable for testing).
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Link installers configured for this run.
    pub reconciler: Reconciler,
    results: Mutex<Vec<LinkResult>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.config.root)
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("force", &self.force)
            .field("executor", &self.executor)
            .field("fs_ops", &self.fs_ops)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates a new context for task execution.
    ///
    /// The reconciler is configured from the `[heuristics]`, `[sourceable]`
    /// and `ignore` settings of `config`.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        fs_ops: Arc<dyn FileSystemOps>,
        dry_run: bool,
        force: bool,
    ) -> Self {
        let force = force || config.defaults.force;
        let reconciler = Reconciler::new(
            Arc::clone(&fs_ops),
            PathResolver::new(platform.home.clone(), config.root.clone()),
        )
        .with_heuristics(config.heuristics())
        .with_sourceable(config.sourceable.files.clone())
        .with_ignore(&config.ignore)
        .force(force)
        .dry_run(dry_run);

        Self {
            config,
            platform,
            log,
            dry_run,
            force,
            executor,
            fs_ops,
            reconciler,
            results: Mutex::new(Vec::new()),
        }
    }

    /// Root directory of the dotfiles repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// User's home directory path.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.platform.home
    }

    /// Path resolution for this run.
    #[must_use]
    pub const fn paths(&self) -> &PathResolver {
        self.reconciler.paths()
    }

    /// Expand a configured target (`~/...` or absolute).
    #[must_use]
    pub fn resolve_target(&self, target: &str) -> PathBuf {
        self.paths().resolve_target(target)
    }

    /// Append link results produced by a task.
    pub fn record_results(&self, results: impl IntoIterator<Item = LinkResult>) {
        if let Ok(mut guard) = self.results.lock() {
            guard.extend(results);
        }
    }

    /// All link results recorded so far, in declaration order.
    #[must_use]
    pub fn link_results(&self) -> Vec<LinkResult> {
        self.results
            .lock()
            .map_or_else(|_| Vec::new(), |guard| guard.clone())
    }
}
