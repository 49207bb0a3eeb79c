//! Command line shared by every test binary.

use clap::Parser;
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Command line of an insanity test.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about = "Insanity test")]
pub struct RunnerCli {
    /// Print the declaration catalog as JSON and exit
    #[arg(long = "insanity-metadata", conflicts_with = "run")]
    pub insanity_metadata: bool,

    /// Run the test (standalone unless --dbus-uuid is given)
    #[arg(long)]
    pub run: bool,

    /// Run under a controller on the private bus, with this run id
    #[arg(long = "dbus-uuid", value_name = "UUID", requires = "run")]
    pub dbus_uuid: Option<String>,

    /// Watchdog period in seconds (<= 0 disables)
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Directory under which unnamed output files are created
    #[arg(long = "output-directory", value_name = "DIR")]
    pub output_directory: Option<PathBuf>,

    /// Keep unnamed output files after the run
    #[arg(long = "keep-unnamed-output-files")]
    pub keep_unnamed_output_files: bool,

    /// Path to a TOML config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Argument values for a standalone run
    #[arg(value_name = "LABEL=VALUE", requires = "run")]
    pub pairs: Vec<String>,
}

impl RunnerCli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            timeout_secs: self.timeout,
            output_directory: self.output_directory.clone(),
            keep_unnamed_output_files: self.keep_unnamed_output_files,
        }
    }
}
