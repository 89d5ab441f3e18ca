//! Configuration validation module

use crate::config::{
    AcquisitionConfig, ApplianceConfig, LoggingConfig, OutputConfig, ReportConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Appliance configuration error: {message}")]
    Appliance { message: String },

    #[error("Report configuration error: {message}")]
    Report { message: String },

    #[error("Acquisition configuration error: {message}")]
    Acquisition { message: String },

    #[error("Output configuration error: {message}")]
    Output { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn appliance(message: impl Into<String>) -> Self {
        Self::Appliance {
            message: message.into(),
        }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::Acquisition {
            message: message.into(),
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for ApplianceConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::appliance("Host cannot be empty"));
        }
        if self.username.is_empty() {
            return Err(ValidationError::appliance("Username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::appliance("Password cannot be empty"));
        }
        if self.adom.is_empty() {
            return Err(ValidationError::appliance("Adom cannot be empty"));
        }
        if self.timeout_seconds == 0 {
            return Err(ValidationError::appliance(
                "Request timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.device.is_empty() {
            return Err(ValidationError::report("Device cannot be empty"));
        }
        if self.layout_id <= 0 {
            return Err(ValidationError::report(format!(
                "Layout id must be positive, got {}",
                self.layout_id
            )));
        }
        if self.time_period.is_empty() {
            return Err(ValidationError::report("Time period cannot be empty"));
        }
        Ok(())
    }
}

impl Validate for AcquisitionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_seconds == 0 {
            return Err(ValidationError::acquisition(
                "Poll interval must be greater than 0",
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(ValidationError::acquisition(
                "Poll attempt budget must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for OutputConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.filename.is_empty() {
            return Err(ValidationError::output("Filename cannot be empty"));
        }
        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.level.is_empty() {
            return Err(ValidationError::logging("Level cannot be empty"));
        }
        match self.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ValidationError::logging(format!(
                "Format must be 'pretty' or 'json', got '{other}'"
            ))),
        }
    }
}
