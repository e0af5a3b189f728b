//! Symlink entries of `dotfiles.toml`.
use serde::Deserialize;

use crate::resources::paths::HOME_ALIAS;

/// A declared link: repository source → target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symlink {
    /// Path relative to the repository root.
    pub source: String,
    /// Target path, `~`-prefixed or absolute.
    pub target: String,
    /// Per-entry force override; `None` follows the run's setting.
    pub force: Option<bool>,
}

/// A single `[[symlinks]]` entry in the raw file: either a plain source path
/// or a structured table with an explicit target.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SymlinkEntry {
    /// Plain string: `"gitconfig"`, whose target is `~/.gitconfig` by convention.
    Simple(String),
    /// Structured: `{ source = "git/gitconfig", target = "~/.gitconfig" }`.
    WithTarget {
        source: String,
        target: Option<String>,
        force: Option<bool>,
    },
}

impl From<SymlinkEntry> for Symlink {
    fn from(entry: SymlinkEntry) -> Self {
        match entry {
            SymlinkEntry::Simple(source) => Self {
                target: conventional_target(&source),
                source,
                force: None,
            },
            SymlinkEntry::WithTarget {
                source,
                target,
                force,
            } => Self {
                target: target.map_or_else(|| conventional_target(&source), |t| home_relative(&t)),
                source,
                force,
            },
        }
    }
}

/// `git/gitconfig` → `~/.git/gitconfig`, `gitconfig` → `~/.gitconfig`.
fn conventional_target(source: &str) -> String {
    format!("{HOME_ALIAS}/.{}", source.trim_start_matches('/'))
}

/// Targets written without `~` or a leading `/` are relative to the home
/// directory.
#[must_use]
pub fn home_relative(target: &str) -> String {
    let is_absolute = std::path::Path::new(target).is_absolute() || target.starts_with('/');
    if target.is_empty() || is_absolute || target.starts_with(HOME_ALIAS) {
        target.to_string()
    } else {
        format!("{HOME_ALIAS}/{target}")
    }
}
