//! API clients for the remote appliance

pub mod fortianalyzer;

pub use fortianalyzer::{FortiAnalyzerClient, Operation, SessionError};
