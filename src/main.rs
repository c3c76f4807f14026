mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{AgentCommand, Cli, Command, PlanCommand};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

impl Context {
    /// Load the config named on the command line, or the default one
    pub fn config(&self) -> Result<config::DeckhandConfig> {
        config::DeckhandConfig::load(self.config_path.as_deref())
    }
}

fn main() -> Result<()> {
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
        config_path: cli.config,
    };

    match cli.command {
        Command::Plan(cmd) => match cmd {
            PlanCommand::Validate { file } => commands::plan::validate(&ctx, &file),
            PlanCommand::Id { file, environment } => commands::plan::id(&ctx, &file, &environment),
            PlanCommand::Slice { file, output_dir } => {
                commands::plan::slice(&ctx, &file, output_dir.as_deref())
            }
            PlanCommand::Apply(args) => commands::plan::apply(&ctx, args),
        },
        Command::Agent(cmd) => match cmd {
            AgentCommand::Run { hostplan, run } => commands::agent::run(&ctx, &hostplan, run),
        },
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "deckhand", &mut io::stdout());
            Ok(())
        }
    }
}
