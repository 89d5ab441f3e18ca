//! fortipage CLI - acquire appliance reports from the command line

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::config::{Config, Validate};
use crate::logging::init_tracing;

/// fortipage - FortiAnalyzer report acquisition for the status-poster pipeline
#[derive(Parser, Debug)]
#[command(
    name = "fortipage",
    version,
    about = "Acquire a FortiAnalyzer report and extract the poster datasets",
    long_about = "fortipage drives the appliance's report-generation protocol (login, \
                  submit, poll, download, cleanup) and writes the extracted \"Botnet \
                  Victims\" and \"Top 20 Users by Bandwidth\" tables to a timestamped \
                  output file.\n\n\
                  Connection settings come from FORTIPAGE__* environment variables or \
                  an optional config/default file; see the README for the full list."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Acquire a report and write the extracted datasets
    #[command(visible_alias = "f")]
    Fetch(commands::fetch::FetchArgs),
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    /// Parse arguments into a runnable application.
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    /// Run the selected command and return its exit code.
    pub async fn run(self) -> anyhow::Result<i32> {
        let mut config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("fortipage: {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };

        if self.cli.verbose {
            config.logging.level = "debug".to_string();
        } else if self.cli.quiet {
            config.logging.level = "error".to_string();
        }

        match self.cli.command {
            Commands::Fetch(ref args) => {
                args.apply(&mut config);
                if let Err(e) = config.validate() {
                    eprintln!("fortipage: {e}");
                    return Ok(exit_codes::CONFIG_ERROR);
                }
                init_tracing(&config.logging)?;
                commands::fetch::run(&config, args).await
            }
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Exit codes for CI integration
pub mod exit_codes {
    /// Success - report acquired and datasets written
    pub const SUCCESS: i32 = 0;
    /// The appliance rejected the acquisition or the payload was unusable
    pub const ACQUISITION_FAILED: i32 = 1;
    /// Configuration or input error
    pub const CONFIG_ERROR: i32 = 2;
    /// Network-layer failure reaching the appliance
    pub const NETWORK_ERROR: i32 = 3;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = 99;
}
