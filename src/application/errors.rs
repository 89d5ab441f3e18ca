//! Application-level error types

use crate::domain::report::JobStateError;
use crate::infrastructure::api_clients::SessionError;
use crate::infrastructure::parsers::ReportParseError;

/// Failure of the end-to-end report acquisition.
///
/// There is no partial-success mode: any of these halts the pipeline and no
/// output is produced.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(
        "report generation did not complete within the poll budget \
         ({attempts} polls, ~{waited_seconds}s)"
    )]
    PollBudgetExhausted { attempts: u32, waited_seconds: u64 },

    #[error("report payload could not be parsed: {0}")]
    Parse(#[from] ReportParseError),

    #[error("acquisition sequencing bug: {0}")]
    State(#[from] JobStateError),
}

impl AcquisitionError {
    /// Whether the failure happened at the network layer rather than inside
    /// the appliance or the payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, AcquisitionError::Session(SessionError::Transport(_)))
    }
}
