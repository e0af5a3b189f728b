use clap::{Args, Parser, Subcommand};

/// Top-level CLI entry point for the dotfiles manager.
#[derive(Parser, Debug)]
#[command(
    name = "dotfiles",
    about = "Link dotfiles into place without clobbering what is already there",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Replace plain files and links managed elsewhere (after backing them up)
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Override dotfiles root directory
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,

    /// Exit non-zero when any conflict remains
    #[arg(long, global = true)]
    pub strict: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create directories, link dotfiles, generate templates, run shell commands
    Install(InstallOpts),
    /// Create directories and link dotfiles only
    Link,
    /// Remove links created by install or link
    Unlink,
    /// Show how every declared link looks right now
    Status,
    /// Undo the most recent install or link
    Rollback,
    /// Inspect and manage backups
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Print version information
    Version,
}

impl Command {
    /// Subcommand name, used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Link => "link",
            Self::Unlink => "unlink",
            Self::Status => "status",
            Self::Rollback => "rollback",
            Self::Backup(_) => "backup",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Skip specific tasks
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only specific tasks
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// `backup` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum BackupCommand {
    /// List backups, newest first
    List,
    /// Copy a backup back to its original location
    Restore(RestoreOpts),
    /// Remove backups past the retention limits
    Clean(CleanOpts),
}

/// Options for `backup restore`.
#[derive(Args, Debug, Clone)]
pub struct RestoreOpts {
    /// Backup id (or stored backup path)
    pub id: String,

    /// Replace a managed symlink at the original path
    #[arg(long)]
    pub overwrite: bool,
}

/// Options for `backup clean`; unset values come from `[backup]`.
#[derive(Args, Debug, Clone, Default)]
pub struct CleanOpts {
    /// Remove backups older than this many days
    #[arg(long)]
    pub max_age_days: Option<u32>,

    /// Keep at most this many backups per file (0 = unlimited)
    #[arg(long)]
    pub max_count: Option<usize>,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_dry_run() {
        let cli = Cli::parse_from(["dotfiles", "--dry-run", "install"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn parse_install_dry_run_short() {
        let cli = Cli::parse_from(["dotfiles", "-d", "install"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["dotfiles", "link", "-f", "--strict"]);
        assert!(cli.global.force);
        assert!(cli.global.strict);
        assert!(matches!(cli.command, Command::Link));
    }

    #[test]
    fn parse_install_skip_tasks() {
        let cli = Cli::parse_from(["dotfiles", "install", "--skip", "shell,templates"]);
        assert!(
            matches!(&cli.command, Command::Install(_)),
            "Expected Install command"
        );
        if let Command::Install(opts) = cli.command {
            assert_eq!(opts.skip, vec!["shell", "templates"]);
        }
    }

    #[test]
    fn parse_install_only_tasks() {
        let cli = Cli::parse_from(["dotfiles", "install", "--only", "links"]);
        assert!(matches!(&cli.command, Command::Install(_)));
        if let Command::Install(opts) = cli.command {
            assert_eq!(opts.only, vec!["links"]);
        }
    }

    #[test]
    fn parse_backup_restore() {
        let cli = Cli::parse_from(["dotfiles", "backup", "restore", "abc", "--overwrite"]);
        assert!(
            matches!(&cli.command, Command::Backup(BackupCommand::Restore(_))),
            "Expected backup restore, got {:?}",
            cli.command
        );
        if let Command::Backup(BackupCommand::Restore(opts)) = cli.command {
            assert_eq!(opts.id, "abc");
            assert!(opts.overwrite);
        }
    }

    #[test]
    fn parse_backup_clean_limits() {
        let cli = Cli::parse_from(["dotfiles", "backup", "clean", "--max-age-days", "7"]);
        assert!(matches!(&cli.command, Command::Backup(BackupCommand::Clean(_))));
        if let Command::Backup(BackupCommand::Clean(opts)) = cli.command {
            assert_eq!(opts.max_age_days, Some(7));
            assert_eq!(opts.max_count, None);
        }
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["dotfiles", "version"]);
        assert!(matches!(cli.command, Command::Version));
        assert_eq!(cli.command.name(), "version");
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["dotfiles", "-v", "status"]);
        assert!(cli.verbose);
        assert_eq!(cli.command.name(), "status");
    }

    #[test]
    fn parse_root_override() {
        let cli = Cli::parse_from(["dotfiles", "--root", "/tmp/dotfiles", "rollback"]);
        assert_eq!(
            cli.global.root,
            Some(std::path::PathBuf::from("/tmp/dotfiles"))
        );
    }
}
