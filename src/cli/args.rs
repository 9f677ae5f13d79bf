//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Tanglegram optimizer: rotate internal nodes of several trees until their shared leaves line up
#[derive(Parser, Debug)]
#[command(name = "detangle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Config file replacing ./.detangle.toml
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimize the trees, checkpointing every improvement
    Run(RunArgs),

    /// Print crossings, flatness, alpha and the objective of the trees as loaded
    Score {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print each tree's structure, leaf order and twist vector
    Show {
        #[command(flatten)]
        input: InputArgs,
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

/// Tree files to load.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Tree documents, loaded in the given order (the first tree is the anchor)
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    /// Refuse tree sets whose trees do not share their leaves
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory receiving result.dat, result1.dat and result2.dat
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Random seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the first tree fixed
    #[arg(long)]
    pub skip_first_tree: bool,

    /// Random increments per proposal at the start
    #[arg(long)]
    pub starting_intensity: Option<usize>,

    /// Upper bound on full passes over all trees
    #[arg(long)]
    pub max_count: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented config template
    Template,
    /// Show global config path
    Path,
}
