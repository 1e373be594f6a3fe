//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cotejador: CLI for Cotejo - golden-master visual regression runner
#[derive(Parser, Debug)]
#[command(name = "cotejador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every test under a test root
    Run(RunArgs),

    /// List discovered tests without running them
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Root directory holding one subdirectory per test
    pub test_root: PathBuf,

    /// Suite configuration file (JSON); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persistent working root instead of ephemeral temp dirs
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Keep working directories after the run
    #[arg(long)]
    pub no_cleanup: bool,

    /// Ceiling on concurrent comparison subprocesses
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Host readiness timeout in seconds
    #[arg(long)]
    pub host_timeout: Option<u64>,

    /// Replay script for the scripted host (JSON map of generated files)
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Explicit path to the ImageMagick convert binary; byte comparison
    /// is used when omitted
    #[arg(long)]
    pub convert_tool: Option<PathBuf>,

    /// Emit the summary as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Root directory holding one subdirectory per test
    pub test_root: PathBuf,
}
