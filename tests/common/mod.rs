// Shared helpers for integration tests.
//
// Provides a temporary home directory with a dotfiles repository inside it,
// and a fluent builder so each integration test can set up an isolated
// environment without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotfiles_manager::cli::GlobalOpts;
use dotfiles_manager::config::Config;
use dotfiles_manager::exec::SystemExecutor;
use dotfiles_manager::logging::{Log, Logger};
use dotfiles_manager::operations::SystemFileSystemOps;
use dotfiles_manager::platform::{Os, Platform};
use dotfiles_manager::resources::state::{RunState, STATE_FILE_NAME, StateStore};
use dotfiles_manager::tasks::Context;

/// Configuration used when a test does not supply its own.
///
/// The recency heuristic is disabled because every file a test writes is
/// brand new.
pub const DEFAULT_CONFIG: &str = r#"
directories = ["~/.local/bin"]

[heuristics]
recent_window_secs = 0

[[symlinks]]
source = "git/gitconfig"
target = "~/.gitconfig"

[[symlinks]]
source = "shell/zshrc"
target = "~/.zshrc"

[[symlinks]]
source = "vim/vimrc"
target = "~/.vimrc"
"#;

/// An isolated home directory with a repository at `~/dotfiles`.
///
/// Everything is deleted when dropped (via the underlying
/// [`tempfile::TempDir`]).
pub struct IntegrationTestContext {
    dir: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Path to the temporary home directory.
    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Path to the repository root.
    pub fn root(&self) -> PathBuf {
        self.home().join("dotfiles")
    }

    /// Path of `rel` inside the home directory.
    pub fn home_path(&self, rel: &str) -> PathBuf {
        self.home().join(rel)
    }

    /// Read a file in the home directory.
    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home_path(rel)).expect("read home file")
    }

    /// Write a file in the home directory.
    pub fn write_home(&self, rel: &str, content: &str) {
        write_file(&self.home_path(rel), content);
    }

    /// Whether `rel` in the home directory is a symlink into the repository.
    pub fn is_managed_link(&self, rel: &str) -> bool {
        std::fs::read_link(self.home_path(rel)).is_ok_and(|dest| dest.starts_with(self.root()))
    }

    /// Load `dotfiles.toml` from the repository.
    pub fn load_config(&self) -> Config {
        Config::load(&self.root()).expect("load config")
    }

    /// Build a task context on the real filesystem.
    pub fn context(&self, dry_run: bool, force: bool) -> (Context, Arc<Logger>) {
        let log = Arc::new(Logger::new("test"));
        let shared: Arc<dyn Log> = log.clone();
        let ctx = Context::new(
            Arc::new(self.load_config()),
            Arc::new(Platform::new(Os::Linux, self.home())),
            shared,
            Arc::new(SystemExecutor),
            Arc::new(SystemFileSystemOps),
            dry_run,
            force,
        );
        (ctx, log)
    }

    /// Global options pointing at this repository.
    pub fn global(&self, dry_run: bool, force: bool) -> GlobalOpts {
        GlobalOpts {
            root: Some(self.root()),
            dry_run,
            force,
            strict: false,
        }
    }

    /// The persisted run state, if any.
    pub fn run_state(&self) -> Option<RunState> {
        StateStore::new(Arc::new(SystemFileSystemOps), &self.home())
            .load()
            .expect("load run state")
    }

    /// Whether the run state file exists.
    pub fn has_run_state(&self) -> bool {
        self.home_path(STATE_FILE_NAME).exists()
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write file");
}

/// Fluent builder for [`IntegrationTestContext`].
///
/// Starts with [`DEFAULT_CONFIG`] and the three sources it names.
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context backed by the default repository.
    pub fn new() -> Self {
        let ctx = IntegrationTestContext {
            dir: tempfile::tempdir().expect("create temp dir"),
        };
        std::fs::create_dir_all(ctx.root()).expect("create repository");
        Self { ctx }
            .with_config(DEFAULT_CONFIG)
            .with_source("git/gitconfig", "[user]\n\tname = test\n")
            .with_source("shell/zshrc", "alias ll='ls -l'\n")
            .with_source("vim/vimrc", "set number\n")
    }

    /// Replace `dotfiles.toml`.
    pub fn with_config(self, content: &str) -> Self {
        write_file(&self.ctx.root().join("dotfiles.toml"), content);
        self
    }

    /// Create a file inside the repository.
    pub fn with_source(self, rel: &str, content: &str) -> Self {
        write_file(&self.ctx.root().join(rel), content);
        self
    }

    /// Create a file in the home directory before anything runs.
    pub fn with_home_file(self, rel: &str, content: &str) -> Self {
        self.ctx.write_home(rel, content);
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
