//! Loading of `dotfiles.toml`, the single configuration file at the
//! repository root.
pub mod symlinks;
pub mod toml_loader;
pub mod validation;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::resources::backup::RetentionPolicy;
use crate::resources::classify::{DEFAULT_CONFIG_DIR_SEGMENT, DEFAULT_RECENT_WINDOW, Heuristics};
use crate::resources::sourceable::DEFAULT_SOURCEABLE_FILES;

/// File name of the configuration at the repository root.
pub const CONFIG_FILE: &str = "dotfiles.toml";

/// `[defaults]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    /// Run-level force; `--force` on the command line turns it on as well.
    pub force: bool,
}

/// `[backup]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupSettings {
    /// Backups older than this are removed by `backup clean`.
    pub max_age_days: u32,
    /// Backups kept per original file by `backup clean`.
    pub max_count: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        let p = RetentionPolicy::default();
        Self {
            max_age_days: p.max_age_days,
            max_count: p.max_count,
        }
    }
}

/// `[heuristics]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeuristicSettings {
    /// Files modified this recently are treated as application-managed.
    pub recent_window_secs: u64,
    /// Files under this path segment are treated as application-managed.
    pub config_dir_segment: String,
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        Self {
            recent_window_secs: DEFAULT_RECENT_WINDOW.as_secs(),
            config_dir_segment: DEFAULT_CONFIG_DIR_SEGMENT.to_string(),
        }
    }
}

/// `[sourceable]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceableSettings {
    /// Target file names merged with a `source` line instead of symlinked.
    pub files: Vec<String>,
}

impl Default for SourceableSettings {
    fn default() -> Self {
        Self {
            files: DEFAULT_SOURCEABLE_FILES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// A `[[templates]]` entry: copied once, never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Template {
    /// Path relative to the repository root.
    pub source: String,
    /// Machine-local target.
    pub target: String,
}

/// A `[[shell_commands]]` entry, run with `sh -c` after linking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellCommand {
    /// Command line.
    pub command: String,
    /// Shown in logs instead of the command.
    #[serde(default)]
    pub description: String,
}

/// Raw file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    directories: Vec<String>,
    ignore: Vec<String>,
    defaults: Defaults,
    backup: BackupSettings,
    heuristics: HeuristicSettings,
    sourceable: SourceableSettings,
    symlinks: Vec<symlinks::SymlinkEntry>,
    templates: Vec<Template>,
    shell_commands: Vec<ShellCommand>,
}

/// All loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Repository root the file was loaded from.
    pub root: PathBuf,
    /// Directories created before linking.
    pub directories: Vec<String>,
    /// Targets never touched.
    pub ignore: Vec<String>,
    /// `[defaults]`.
    pub defaults: Defaults,
    /// `[backup]`.
    pub backup: BackupSettings,
    /// `[heuristics]`.
    pub heuristics: HeuristicSettings,
    /// `[sourceable]`.
    pub sourceable: SourceableSettings,
    /// Link entries, in declaration order.
    pub symlinks: Vec<symlinks::Symlink>,
    /// Template entries.
    pub templates: Vec<Template>,
    /// Post-link shell commands.
    pub shell_commands: Vec<ShellCommand>,
}

impl Config {
    /// Load `<root>/dotfiles.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml_loader::load_config(&root.join(CONFIG_FILE))?;
        Ok(Self::from_raw(root, raw))
    }

    /// Parse configuration text as if it were loaded from `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn parse(root: &Path, content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml_loader::parse_config(&root.join(CONFIG_FILE), content)?;
        Ok(Self::from_raw(root, raw))
    }

    fn from_raw(root: &Path, raw: RawConfig) -> Self {
        let relative = |v: Vec<String>| -> Vec<String> {
            v.iter().map(|t| symlinks::home_relative(t)).collect()
        };
        Self {
            root: root.to_path_buf(),
            directories: relative(raw.directories),
            ignore: relative(raw.ignore),
            defaults: raw.defaults,
            backup: raw.backup,
            heuristics: raw.heuristics,
            sourceable: raw.sourceable,
            symlinks: raw.symlinks.into_iter().map(symlinks::Symlink::from).collect(),
            templates: raw
                .templates
                .into_iter()
                .map(|t| Template {
                    target: symlinks::home_relative(&t.target),
                    source: t.source,
                })
                .collect(),
            shell_commands: raw.shell_commands,
        }
    }

    /// Classifier heuristics from `[heuristics]`.
    #[must_use]
    pub fn heuristics(&self) -> Heuristics {
        Heuristics {
            recent_window: Duration::from_secs(self.heuristics.recent_window_secs),
            config_dir_segment: self.heuristics.config_dir_segment.clone(),
        }
    }

    /// Retention policy from `[backup]`.
    #[must_use]
    pub const fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age_days: self.backup.max_age_days,
            max_count: self.backup.max_count,
        }
    }

    /// Check for common mistakes; see [`validation::validate`].
    #[must_use]
    pub fn validate(&self) -> Vec<validation::ValidationWarning> {
        validation::validate(self)
    }
}
