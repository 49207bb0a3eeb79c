//! Remote test-control harness.
//!
//! Turns a piece of test logic into something a controller can drive over a
//! private bus, or that runs by itself from the command line:
//!
//! ```no_run
//! use insanity_core::Test;
//!
//! fn main() -> anyhow::Result<std::process::ExitCode> {
//!     let test = Test::builder("example", "Checks that 1 + 1 is 2")
//!         .checklist_item("sum", "the sum is right", None, false)?
//!         .on_start(|t| {
//!             t.validate("sum", 1 + 1 == 2, None);
//!             t.done();
//!             Ok(())
//!         })
//!         .build();
//!     Ok(test.run())
//! }
//! ```

pub mod arguments;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod loglevel;
pub mod metadata;
pub mod output_files;
pub mod registry;
mod remote;
mod runner;
pub mod signals;
pub mod standalone;
pub mod usage;
pub mod value;
pub mod watchdog;
pub mod wire;
pub mod worker;

pub use arguments::{ArgumentError, CallArgs};
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use lifecycle::{RunLevel, TransitionError};
pub use loglevel::LogLevel;
pub use metadata::TestMetadata;
pub use output_files::OutputFileError;
pub use registry::RegistryError;
pub use standalone::{ItemOutcome, RunReport};
pub use test::{Test, TestBuilder};
pub use value::{Value, ValueKind};
pub use watchdog::WaitOutcome;
