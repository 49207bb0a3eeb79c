//! Controller side of the insanity test bus.
//!
//! Spawns a test binary in remote mode on a private Unix socket, drives its
//! lifecycle and collects the signals it sends back.

pub mod args;
pub mod cli;
pub mod commands;
pub mod controller;
pub mod error;
pub mod framing;

pub use controller::{
    BusClient, ControllerOptions, NO_TIMEOUT_ITEM, RunOutcome, TestController, fetch_metadata,
};
pub use error::ControllerError;
