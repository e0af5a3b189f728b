//! Personal dotfiles manager.
//!
//! Declares links from a dotfiles repository into the home directory in
//! `dotfiles.toml` and reconciles them safely: each target is classified
//! before anything is touched, files written by other applications and
//! symlinks pointing outside the repository are never replaced, plain files
//! are backed up before they are displaced, and the last run can be rolled
//! back. Shell startup files (`.zshrc`, `.bashrc`, ...) receive a `source`
//! line instead of being replaced by a symlink.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: load and validate `dotfiles.toml`
//! - **[`resources`]**: classification, link installers, backups, run state and rollback
//! - **[`tasks`]**: named units of work wired to resources
//! - **[`commands`]**: subcommand orchestration (`install`, `link`, `unlink`, `status`,
//!   `rollback`, `backup`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod operations;
pub mod platform;
pub mod resources;
pub mod tasks;
