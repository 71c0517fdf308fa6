use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vwc",
    about = "Virtual working copy: change detection against snapshot trees",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare a working directory with one or more snapshot directories
    Status(StatusArgs),
    /// Compare two snapshot directories
    Diff(DiffArgs),
    /// Import a directory as a snapshot and print its tree id
    Import(ImportArgs),
}

/// Options shared by commands that run a diff.
#[derive(Args, Debug, Default)]
pub struct DiffFlags {
    /// TOML file with diff options
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Report ignored files
    #[arg(long)]
    pub ignored: bool,
    /// Match names case-insensitively
    #[arg(long)]
    pub case_insensitive: bool,
    /// Treat symlinks as regular files
    #[arg(long)]
    pub no_symlinks: bool,
    /// Extra ignore rules (gitignore syntax) applied to the whole tree
    #[arg(long)]
    pub exclude_from: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Working directory to inspect
    pub workdir: PathBuf,
    /// Snapshot directory to compare against; repeat to give several
    #[arg(long = "against", required = true)]
    pub against: Vec<PathBuf>,
    #[command(flatten)]
    pub flags: DiffFlags,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[command(flatten)]
    pub flags: DiffFlags,
}

#[derive(Args)]
pub struct ImportArgs {
    pub path: PathBuf,
}
