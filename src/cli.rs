use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::paths::{ENV_CONFIG, ENV_REPO};

#[derive(Parser)]
#[command(name = "notebook-stack")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declare and synthesize a managed notebook environment", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stack config file (default: ./stack.toml, then the user config dir)
    #[arg(long, global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Synthesize the provisioning template
    Synth(SynthArgs),

    /// Compare a fresh synthesis against a previously written template
    Diff(DiffArgs),

    /// List declared resources in deployment order
    Resources(ResourcesArgs),

    /// Build the stack and report problems without writing anything
    Validate(BuildArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Inputs shared by every command that builds the stack
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Repository to link to the notebook (URL or registered name)
    #[arg(long, env = ENV_REPO)]
    pub repo: Option<String>,

    /// Startup script path, overriding the config ("-" reads stdin)
    #[arg(long)]
    pub script: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SynthArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Write the template and a manifest into this directory instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Previously synthesized template
    #[arg(long)]
    pub against: PathBuf,

    /// Also show a line diff of the template JSON
    #[arg(long)]
    pub text: bool,
}

#[derive(Args, Debug)]
pub struct ResourcesArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Filter: type (bucket, subnet, iam, network...) or type.name
    pub target: Option<String>,

    /// Show teardown order instead of creation order
    #[arg(long, conflicts_with = "waves")]
    pub teardown: bool,

    /// Group resources into deployment waves
    #[arg(long)]
    pub waves: bool,
}
