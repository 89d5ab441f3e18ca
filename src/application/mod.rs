//! Application use cases and error types

pub mod acquisition;
pub mod errors;

pub use acquisition::{AcquireReportUseCase, AcquiredReport, PollPolicy};
pub use errors::AcquisitionError;
