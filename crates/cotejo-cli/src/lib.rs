//! Cotejo CLI library.
//!
//! Command definitions and execution for the `cotejador` binary.

#![warn(missing_docs)]

mod commands;
mod error;
mod script;

pub use commands::{Cli, Commands, ListArgs, RunArgs};
pub use error::{CliError, CliResult};
pub use script::HostScript;

use console::style;
use cotejo::{
    discover, ByteDiffComparator, Comparator, DocumentHost, MagickComparator, ScriptedHost,
    SuiteConfig, SuiteOrchestrator,
};
use std::sync::Arc;
use tracing::debug;

/// Initialize tracing from the verbosity flags; `RUST_LOG` wins when set.
pub fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the `run` command.
///
/// # Errors
///
/// Returns error on fatal suite failure or when any test did not pass.
pub async fn run_suite(args: &RunArgs) -> CliResult<()> {
    let config = build_config(args)?;
    let host = build_host(args)?;
    let comparator = build_comparator(args);

    let orchestrator = SuiteOrchestrator::new(config, host, comparator);

    // interrupt sweeps any live working directory before the process dies
    let workspace = orchestrator.workspace().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            workspace.cleanup_all();
            std::process::exit(130);
        }
    });

    let summary = orchestrator.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.render());
        let verdict = format!(
            "{}/{} tests passed",
            summary.passed_count(),
            summary.total_count()
        );
        if summary.all_passed() {
            eprintln!("{}", style(verdict).green().bold());
        } else {
            eprintln!("{}", style(verdict).red().bold());
        }
    }

    if summary.all_passed() {
        Ok(())
    } else {
        Err(CliError::suite_failed(format!(
            "{} of {} test(s) did not pass",
            summary.total_count() - summary.passed_count(),
            summary.total_count()
        )))
    }
}

/// Execute the `list` command.
///
/// # Errors
///
/// Returns error when the test root cannot be read.
pub fn run_list(args: &ListArgs) -> CliResult<()> {
    let config = SuiteConfig::new(&args.test_root);
    let tests = discover(&config)?;
    for test in &tests {
        println!(
            "{}  ({} -> {}, max metric {})",
            test.name, test.input, test.output, test.max_compare_metric
        );
    }
    println!("{} test(s) discovered", tests.len());
    Ok(())
}

fn build_config(args: &RunArgs) -> CliResult<SuiteConfig> {
    let mut config = match &args.config {
        Some(path) => SuiteConfig::load(path)?,
        None => SuiteConfig::default(),
    };
    config.test_root.clone_from(&args.test_root);
    if let Some(dir) = &args.working_dir {
        config.working_directory = Some(dir.clone());
    }
    if args.no_cleanup {
        config.cleanup = false;
    }
    if let Some(limit) = args.concurrency {
        if limit == 0 {
            return Err(CliError::config("--concurrency must be at least 1"));
        }
        config.max_concurrent_comparisons = limit;
    }
    if let Some(secs) = args.host_timeout {
        config.host_ready_timeout_ms = secs.saturating_mul(1_000);
    }
    Ok(config)
}

fn build_host(args: &RunArgs) -> CliResult<Arc<dyn DocumentHost>> {
    let host = match &args.script {
        Some(path) => {
            debug!(script = %path.display(), "loading replay script");
            HostScript::load(path)?.into_host()
        }
        None => ScriptedHost::new(),
    };
    Ok(Arc::new(host))
}

fn build_comparator(args: &RunArgs) -> Arc<dyn Comparator> {
    match &args.convert_tool {
        Some(tool) => Arc::new(MagickComparator::with_tool(tool)),
        None => Arc::new(ByteDiffComparator),
    }
}
