//! fortipage - FortiAnalyzer report acquisition for the one-page status poster
//!
//! Drives the appliance's report-generation protocol (login, submit job,
//! poll progress, download, cleanup) and extracts the two tabular datasets
//! the poster-rendering pipeline consumes.
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with file and environment variable support
//! - [`domain`] — Report job lifecycle, progress, and extracted-record models
//! - [`application`] — The end-to-end acquisition use case and its errors
//! - [`infrastructure`] — Appliance API client and report XML parsers
//! - [`cli`] — Command-line interface and output writing
//! - [`logging`] — Structured logging with tracing
//!
//! # Configuration
//!
//! Environment variables use the `FORTIPAGE__` prefix with double underscore
//! separators:
//!
//! ```bash
//! FORTIPAGE__APPLIANCE__HOST=analyzer.example.net
//! FORTIPAGE__REPORT__LAYOUT_ID=7
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
