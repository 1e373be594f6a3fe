//! Cotejador: run golden-master visual regression suites.
//!
//! ## Usage
//!
//! ```bash
//! cotejador run test/                    # Run all tests under test/
//! cotejador run test/ --no-cleanup      # Keep working directories
//! cotejador run test/ --json           # Machine-readable summary
//! cotejador list test/                 # Show discovered tests
//! ```

use clap::Parser;
use cotejo_cli::{init_tracing, run_list, run_suite, Cli, Commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Run(args) => run_suite(args).await,
        Commands::List(args) => run_list(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
