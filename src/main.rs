use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use dotfiles_manager::cli::{Cli, Command};
use dotfiles_manager::commands;
use dotfiles_manager::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    if matches!(args.command, Command::Version) {
        commands::version::run();
        return Ok(());
    }

    let name = args.command.name();
    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(Logger::new(name));

    match &args.command {
        Command::Install(opts) => commands::install::run(&args.global, opts, &log),
        Command::Link => commands::link::run(&args.global, &log),
        Command::Unlink => commands::unlink::run(&args.global, &log),
        Command::Status => commands::status::run(&args.global, &log),
        Command::Rollback => commands::rollback::run(&args.global, &log),
        Command::Backup(cmd) => commands::backup::run(&args.global, cmd, &log),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
