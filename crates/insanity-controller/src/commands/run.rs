//! `run` subcommand: one remote-controlled run of a test.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;

use crate::args::call_args_from_pairs;
use crate::cli::RunArgs;
use crate::controller::{ControllerOptions, TestController, fetch_metadata};

/// Run the `run` subcommand.
///
/// Prints one line per checklist item and exits with failure when any item
/// failed or was skipped, or the test timed out.
///
/// # Errors
///
/// Fails if the metadata cannot be read, an argument does not convert, or
/// the bus conversation breaks down.
pub async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let metadata = fetch_metadata(&args.program).await?;
    let batch = call_args_from_pairs(&metadata, &args.pairs)?;
    let period = u64::try_from(args.timeout)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    let options = ControllerOptions {
        call_timeout: Duration::from_secs(args.call_timeout),
        ..ControllerOptions::default()
    };
    let controller = TestController::spawn(&args.program, options)
        .await
        .with_context(|| format!("starting {}", args.program.display()))?;
    let outcome = controller
        .run(&batch, period)
        .await
        .with_context(|| format!("running {}", metadata.name))?;

    let report = outcome.report(&metadata);
    println!("{report}");
    if outcome.timed_out {
        if let Some(p) = period {
            println!("timeout: no progress for {}s", p.as_secs());
        }
    }
    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
