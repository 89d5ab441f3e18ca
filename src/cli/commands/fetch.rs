//! Fetch command - run the acquisition pipeline and write the datasets

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::{error, info};

use crate::application::{AcquireReportUseCase, PollPolicy};
use crate::cli::exit_codes;
use crate::cli::output::{OutputFormat, OutputWriter, timestamped_filename};
use crate::config::Config;
use crate::infrastructure::api_clients::FortiAnalyzerClient;

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Device name the report covers (overrides config)
    #[arg(long)]
    pub device: Option<String>,

    /// Server-side report layout identifier (overrides config)
    #[arg(long)]
    pub layout_id: Option<i64>,

    /// Reporting time period, e.g. "today" (overrides config)
    #[arg(long)]
    pub time_period: Option<String>,

    /// Directory the output file is written to (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Mask user identifiers in the written output
    #[arg(long)]
    pub anonymize: bool,
}

impl FetchArgs {
    /// Fold the command-line overrides into the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.report.device = device.clone();
        }
        if let Some(layout_id) = self.layout_id {
            config.report.layout_id = layout_id;
        }
        if let Some(time_period) = &self.time_period {
            config.report.time_period = time_period.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output.directory = output_dir.clone();
        }
        if self.anonymize {
            config.output.anonymize = true;
        }
    }
}

/// Run one acquisition and write the extracted datasets.
pub async fn run(config: &Config, args: &FetchArgs) -> Result<i32> {
    let client = match FortiAnalyzerClient::new(&config.appliance) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to construct appliance client");
            return Ok(exit_codes::NETWORK_ERROR);
        }
    };

    let policy = PollPolicy::from_config(&config.acquisition);
    let mut use_case = AcquireReportUseCase::new(client, policy);

    let acquired = match use_case
        .run(
            &config.appliance.username,
            &config.appliance.password,
            &config.report,
        )
        .await
    {
        Ok(acquired) => acquired,
        Err(e) if e.is_transport() => {
            error!(error = %e, "acquisition failed at the network layer");
            return Ok(exit_codes::NETWORK_ERROR);
        }
        Err(e) => {
            error!(error = %e, "report acquisition failed");
            return Ok(exit_codes::ACQUISITION_FAILED);
        }
    };

    let path = config
        .output
        .directory
        .join(timestamped_filename(&config.output.filename));
    let writer = OutputWriter {
        format: args.format,
        anonymize: config.output.anonymize,
    };
    writer.write(&acquired.report, &path)?;

    info!(
        path = %path.display(),
        botnet_victims = acquired.report.botnet_victims.len(),
        top_users = acquired.report.top_users.len(),
        polls = acquired.polls,
        cleanup_ok = acquired.cleanup_error.is_none(),
        "datasets written"
    );
    Ok(exit_codes::SUCCESS)
}
