//! Configuration management
//!
//! Layered loading: an optional `config/default` file, then environment
//! variables with the `FORTIPAGE` prefix and `__` separator (for example
//! `FORTIPAGE__APPLIANCE__HOST`). Validation runs explicitly, after CLI
//! overrides are applied and before the session is constructed.

pub mod validation;

pub use validation::{Validate, ValidationError};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appliance: ApplianceConfig,
    pub report: ReportConfig,
    pub acquisition: AcquisitionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the FortiAnalyzer appliance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplianceConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Administrative-domain scope for all report calls.
    pub adom: String,
    /// Appliances commonly present self-signed certificates, so
    /// verification is off by default; enable it where a proper CA chain
    /// exists.
    pub verify_tls: bool,
    pub timeout_seconds: u64,
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            adom: "root".to_string(),
            verify_tls: false,
            timeout_seconds: 30,
        }
    }
}

/// Which report to generate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Device name the report covers.
    pub device: String,
    /// Server-side report layout identifier.
    pub layout_id: i64,
    pub time_period: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            layout_id: 0,
            time_period: "today".to_string(),
        }
    }
}

/// Poll-loop pacing and budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub poll_interval_seconds: u64,
    pub max_poll_attempts: u32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 3,
            max_poll_attempts: 200,
        }
    }
}

/// Where and how the extracted datasets are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub filename: String,
    /// Mask user identifiers in the written output.
    pub anonymize: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            filename: "report.json".to_string(),
            anonymize: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.appliance.validate()?;
        self.report.validate()?;
        self.acquisition.validate()?;
        self.output.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// The caller validates after applying any CLI overrides.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("FORTIPAGE")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
