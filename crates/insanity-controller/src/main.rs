//! insanity-run: drive insanity tests over a private bus.
//!
//! # Subcommands
//!
//! - `metadata`: print a test's metadata document
//! - `run`: run a test once under remote control

use std::process::ExitCode;

use clap::Parser;
use insanity_core::logging;

use insanity_controller::cli::{Cli, Commands};
use insanity_controller::commands;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Metadata(args) => commands::metadata::run(args).await,
        Commands::Run(args) => commands::run::run(args).await,
    }
}
