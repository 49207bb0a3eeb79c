//! Command-line interface definition for `insanity-run`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Drive insanity tests from the command line.
#[derive(Parser, Debug)]
#[command(name = "insanity-run", version, about = "Drive insanity tests over a private bus")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the metadata document a test declares
    Metadata(MetadataArgs),

    /// Run a test once under remote control and report its checklist
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct MetadataArgs {
    /// Path to the test binary
    pub program: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the test binary
    pub program: PathBuf,

    /// Give up after this many seconds without progress (<= 0 waits forever)
    #[arg(long, default_value_t = 15, allow_negative_numbers = true)]
    pub timeout: i64,

    /// Seconds to wait for each bus call to be answered
    #[arg(long = "call-timeout", default_value_t = 10)]
    pub call_timeout: u64,

    /// Argument values, typed by the test's metadata
    #[arg(value_name = "LABEL=VALUE")]
    pub pairs: Vec<String>,
}
