//! Non-fatal checks over a loaded [`Config`].
use std::collections::HashMap;
use std::path::Path;

use super::{CONFIG_FILE, Config};

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration section (e.g., "symlinks", "templates").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
///
/// Implementations check one section for common issues: missing files,
/// absolute paths, collisions.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, root: &Path) -> Vec<ValidationWarning>;

    /// Section name used in warnings (e.g., "symlinks").
    fn name(&self) -> &'static str;
}

fn check_source(section: &str, root: &Path, source: &str, warnings: &mut Vec<ValidationWarning>) {
    if Path::new(source).is_absolute() || source.starts_with('/') {
        warnings.push(ValidationWarning::new(
            section,
            source,
            format!("source path should be relative to the directory holding {CONFIG_FILE}"),
        ));
    } else if root.join(source).symlink_metadata().is_err() {
        warnings.push(ValidationWarning::new(
            section,
            source,
            format!("source file does not exist: {}", root.join(source).display()),
        ));
    }
}

/// Validator for `[[symlinks]]`.
#[derive(Debug)]
pub struct SymlinkValidator<'a> {
    symlinks: &'a [super::symlinks::Symlink],
}

impl<'a> SymlinkValidator<'a> {
    /// Validate the given entries.
    #[must_use]
    pub const fn new(symlinks: &'a [super::symlinks::Symlink]) -> Self {
        Self { symlinks }
    }
}

impl ConfigValidator for SymlinkValidator<'_> {
    fn validate(&self, root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut seen: HashMap<&str, &str> = HashMap::new();

        for symlink in self.symlinks {
            check_source(self.name(), root, &symlink.source, &mut warnings);

            if symlink.target.trim().is_empty() {
                warnings.push(ValidationWarning::new(
                    self.name(),
                    &symlink.source,
                    "target is empty",
                ));
                continue;
            }

            if let Some(first) = seen.insert(&symlink.target, &symlink.source) {
                warnings.push(ValidationWarning::new(
                    self.name(),
                    &symlink.target,
                    format!(
                        "target declared twice (sources {first} and {}); the later entry will conflict",
                        symlink.source
                    ),
                ));
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "symlinks"
    }
}

/// Validator for `[[templates]]`; also flags targets shared with a symlink.
#[derive(Debug)]
pub struct TemplateValidator<'a> {
    templates: &'a [super::Template],
    symlinks: &'a [super::symlinks::Symlink],
}

impl<'a> TemplateValidator<'a> {
    /// Validate the given templates against the declared symlinks.
    #[must_use]
    pub const fn new(
        templates: &'a [super::Template],
        symlinks: &'a [super::symlinks::Symlink],
    ) -> Self {
        Self {
            templates,
            symlinks,
        }
    }
}

impl ConfigValidator for TemplateValidator<'_> {
    fn validate(&self, root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for template in self.templates {
            check_source(self.name(), root, &template.source, &mut warnings);

            if template.target.trim().is_empty() {
                warnings.push(ValidationWarning::new(
                    self.name(),
                    &template.source,
                    "target is empty",
                ));
            } else if self.symlinks.iter().any(|s| s.target == template.target) {
                warnings.push(ValidationWarning::new(
                    self.name(),
                    &template.target,
                    "target is also declared as a symlink",
                ));
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "templates"
    }
}

/// Validator for `[[shell_commands]]`.
#[derive(Debug)]
pub struct ShellCommandValidator<'a> {
    commands: &'a [super::ShellCommand],
}

impl<'a> ShellCommandValidator<'a> {
    /// Validate the given commands.
    #[must_use]
    pub const fn new(commands: &'a [super::ShellCommand]) -> Self {
        Self { commands }
    }
}

impl ConfigValidator for ShellCommandValidator<'_> {
    fn validate(&self, _root: &Path) -> Vec<ValidationWarning> {
        self.commands
            .iter()
            .filter(|c| c.command.trim().is_empty())
            .map(|c| ValidationWarning::new(self.name(), &c.description, "command is empty"))
            .collect()
    }

    fn name(&self) -> &'static str {
        "shell_commands"
    }
}

/// Run every validator over `config`.
#[must_use]
pub fn validate(config: &Config) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 3] = [
        &SymlinkValidator::new(&config.symlinks),
        &TemplateValidator::new(&config.templates, &config.symlinks),
        &ShellCommandValidator::new(&config.shell_commands),
    ];
    validators
        .iter()
        .flat_map(|v| v.validate(&config.root))
        .collect()
}
