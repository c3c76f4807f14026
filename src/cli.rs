use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(author = "Deckhand Contributors")]
#[command(version)]
#[command(about = "Slice deployment plans per host and run them", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/deckhand/config.toml)
    #[arg(long, global = true, env = "DECKHAND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate, identify, slice and apply deployment plans
    #[command(subcommand)]
    Plan(PlanCommand),

    /// Run host plans received from a controller
    #[command(subcommand)]
    Agent(AgentCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Subcommand)]
pub enum PlanCommand {
    /// Strictly decode and slice a plan, then print a summary
    Validate {
        /// Plan file (JSON)
        file: PathBuf,
    },

    /// Print the content-derived identifier of a plan
    Id {
        /// Plan file (JSON)
        file: PathBuf,

        /// Environment folded into the identifier
        #[arg(short, long, default_value = "")]
        environment: String,
    },

    /// Split a plan into one host plan per host
    Slice {
        /// Plan file (JSON)
        file: PathBuf,

        /// Write hostplan-<host>.json files here instead of printing JSON
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Execute a plan locally, one worker per host
    Apply(ApplyArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Plan file (JSON)
    pub file: PathBuf,

    #[command(flatten)]
    pub run: RunArgs,

    /// Maximum hosts executed concurrently (0 = one worker per host)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

// ============================================================================
// Agent
// ============================================================================

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Execute a single host plan on this machine
    Run {
        /// Host plan file (JSON)
        #[arg(long)]
        hostplan: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Flags shared by the commands that execute steps
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Validate inputs without applying changes
    #[arg(long)]
    pub dry_run: bool,

    /// Only run these step ids; others are reported as filtered
    #[arg(long = "step", value_name = "ID")]
    pub steps: Vec<String>,

    /// Write the execution report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
