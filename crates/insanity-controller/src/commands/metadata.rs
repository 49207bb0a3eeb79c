//! `metadata` subcommand: print a test's declarations.

use std::process::ExitCode;

use crate::cli::MetadataArgs;
use crate::controller::fetch_metadata;

/// Run the `metadata` subcommand.
///
/// # Errors
///
/// Fails if the test cannot be queried or prints an invalid document.
pub async fn run(args: MetadataArgs) -> anyhow::Result<ExitCode> {
    let metadata = fetch_metadata(&args.program).await?;
    println!("{}", metadata.to_json_pretty());
    Ok(ExitCode::SUCCESS)
}
