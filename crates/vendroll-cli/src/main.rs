//! vendroll binary.
//!
//! # Usage
//!
//! ```bash
//! # Roll to the tip of the upstream branch
//! vendroll --workspace ~/fuchsia
//!
//! # Roll to a tag, skip bindings, commit the result
//! vendroll --commit v1.2.3 --skip-bindings --commit-changes
//!
//! # Throw away a half-finished roll
//! vendroll --reset
//! ```
//!
//! Exit status is 0 on success, 2 when subset files need manual resolution,
//! 3 for configuration errors and 1 for anything else.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vendroll_cli::{Args, HttpFetcher, SystemRunner, cli::WORKSPACE_ENV};
use vendroll_core::{RollDriver, RollError, RollOutcome};

fn run(args: &Args) -> Result<RollOutcome, RollError> {
    let workspace = args.workspace_or(std::env::var_os(WORKSPACE_ENV).map(Into::into))?;
    let config = args.resolve(&workspace)?;

    tracing::info!(
        library = %config.name,
        workspace = %config.paths.workspace.display(),
        mode = ?config.mode,
        "vendroll starting"
    );

    RollDriver::new(&config, SystemRunner::new(), HttpFetcher::default()).run()
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(&args) {
        Ok(outcome) => {
            outcome.log_report();
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!("{e}");
            if let Some(failure) = e.process_failure() {
                tracing::debug!(command = %failure.command, "failing command");
            }
            ExitCode::from(e.exit_code())
        },
    }
}
