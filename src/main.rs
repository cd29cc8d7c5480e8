mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod resource;
mod state;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Manifest path from `--config`
    pub config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Plan { target } => commands::plan::run(&ctx, target.as_deref()),
        Command::Apply {
            target,
            yes,
            dry_run,
            jobs,
        } => commands::apply::run(&ctx, target.as_deref(), yes, dry_run, jobs),
        Command::Refresh => commands::refresh::run(&ctx),
        Command::Destroy { target, yes, jobs } => {
            commands::destroy::run(&ctx, target.as_deref(), yes, jobs)
        }
        Command::Import { resource_type, key } => {
            commands::import::run(&ctx, &resource_type, &key)
        }
        Command::Facts { kind, json } => commands::facts::run(&ctx, kind, json),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "linuxhost", &mut io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if ctx.verbose > 0 {
                log::debug!("{e:?}");
            }
            ui::report_error(&e);
            ExitCode::FAILURE
        }
    }
}
