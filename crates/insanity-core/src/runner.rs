//! Process entry point for test binaries.

use std::ffi::OsString;
use std::process::ExitCode;
#[cfg(unix)]
use std::sync::Arc;

use clap::Parser;

use crate::channel::BUS_ADDRESS_ENV;
use crate::cli::RunnerCli;
use crate::config::{HarnessConfig, resolve_config};
use crate::error::HarnessError;
use crate::metadata::TestMetadata;
use crate::signals::ConsoleSink;
use crate::test::Test;

impl Test {
    /// The declaration catalog as a metadata document.
    pub fn metadata(&self) -> TestMetadata {
        TestMetadata::from_registry(
            self.name(),
            self.description(),
            self.full_description(),
            self.registry(),
        )
    }

    /// Parse the process command line and run. Intended as the whole body of
    /// a test's `main`.
    pub fn run(&self) -> ExitCode {
        self.run_with_args(std::env::args_os())
    }

    /// As [`Self::run`], with an explicit argument vector (`argv[0]` first).
    pub fn run_with_args<I, T>(&self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        crate::logging::init();
        let cli = match RunnerCli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                return if e.use_stderr() {
                    ExitCode::from(2)
                } else {
                    ExitCode::SUCCESS
                };
            }
        };
        match self.dispatch_cli(&cli) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "test run failed");
                eprintln!("{}: {e}", self.name());
                ExitCode::FAILURE
            }
        }
    }

    fn dispatch_cli(&self, cli: &RunnerCli) -> Result<ExitCode, HarnessError> {
        if cli.insanity_metadata {
            println!("{}", self.metadata().to_json_pretty());
            return Ok(ExitCode::SUCCESS);
        }
        if !cli.run {
            return Err(HarnessError::Usage(
                "nothing to do: pass --insanity-metadata or --run".to_string(),
            ));
        }
        let config = resolve_config(&cli.overrides())?;
        match &cli.dbus_uuid {
            Some(uuid) => {
                self.run_remote(uuid, &config)?;
                Ok(ExitCode::SUCCESS)
            }
            None => {
                let report = self.run_standalone(&cli.pairs, &config, Box::new(ConsoleSink::stdout()))?;
                println!("{report}");
                Ok(if report.passed() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
        }
    }

    #[cfg(unix)]
    fn run_remote(&self, uuid: &str, config: &HarnessConfig) -> Result<(), HarnessError> {
        let address = std::env::var(BUS_ADDRESS_ENV)
            .ok()
            .filter(|a| !a.is_empty())
            .ok_or(HarnessError::MissingBusAddress)?;
        let channel = crate::channel::SocketChannel::connect(&address)?;
        self.serve(Arc::new(channel), uuid, config)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn run_remote(&self, _uuid: &str, _config: &HarnessConfig) -> Result<(), HarnessError> {
        if std::env::var_os(BUS_ADDRESS_ENV).is_none() {
            return Err(HarnessError::MissingBusAddress);
        }
        Err(HarnessError::Usage(
            "remote mode needs a Unix-domain socket transport".to_string(),
        ))
    }
}
