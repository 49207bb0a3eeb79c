//! Command implementations for `insanity-run` subcommands.

pub mod metadata;
pub mod run;
