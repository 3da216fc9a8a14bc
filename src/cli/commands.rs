//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - analyze: run the analyzers over a directory and print ranked findings
//! - cycle: run one interactive improvement cycle
//! - watch: follow the task feed and run cycles when idle
//! - stats: show acceptance history per category

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ever-thinker - idle-time improvement proposals for completed work
#[derive(Parser, Debug)]
#[command(name = "ever-thinker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Files to analyze
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Project root to analyze
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Project name recorded on the task
    #[arg(short, long)]
    pub project: Option<String>,

    /// Restrict analysis to these files (relative to root)
    pub files: Vec<PathBuf>,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every enabled analyzer and print the ranked findings
    Analyze {
        #[command(flatten)]
        target: TargetArgs,

        /// Show at most this many findings
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Run a single cycle and answer the proposal at the prompt
    Cycle {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Follow the task feed and run cycles whenever the system is idle
    Watch,

    /// Show recorded outcomes per category
    Stats,
}
