//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Synchronize an organizational hierarchy from CSV into the organization registry
#[derive(Parser, Debug)]
#[command(name = "orgsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the registry with a CSV export
    Sync {
        /// Semicolon-separated hierarchy export
        #[arg(value_hint = ValueHint::FilePath)]
        csv: PathBuf,
        /// Read-only run: look up everything, create and update nothing
        #[arg(short, long)]
        simulation: bool,
        /// Log every registry request and response
        #[arg(short, long)]
        debug: bool,
        /// Print the resolved forest with ids and links
        #[arg(short, long)]
        print_structure: bool,
        /// Emit the summary (and structure) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the hierarchy built from a CSV export, without contacting the registry
    Tree {
        /// Semicolon-separated hierarchy export
        #[arg(value_hint = ValueHint::FilePath)]
        csv: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config (secret redacted)
    Show,

    /// Create config template
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show config paths
    Path,
}
