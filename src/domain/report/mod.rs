//! Report domain model: job identity, progress, lifecycle, and extracted datasets

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Opaque identifier of a server-side report-generation run.
///
/// Issued by the appliance at submission time; never interpreted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Completion percentage reported by a single progress poll.
///
/// The appliance does not guarantee monotonicity across polls; each value is
/// authoritative for that poll only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Progress(u8);

/// Error for a progress value outside the 0-100 range.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("progress {0} outside the 0-100 range")]
pub struct InvalidProgress(pub i64);

impl Progress {
    pub fn new(percent: i64) -> Result<Self, InvalidProgress> {
        if (0..=100).contains(&percent) {
            Ok(Self(percent as u8))
        } else {
            Err(InvalidProgress(percent))
        }
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

/// Raised when the caller drives a job through an illegal transition.
///
/// This is a contract violation of the acquisition sequence, not an
/// appliance-side runtime condition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal report job transition: {event} while {state}")]
pub struct JobStateError {
    pub state: &'static str,
    pub event: &'static str,
}

/// Lifecycle of a single report job.
///
/// `Submitted -> Running(0..99)* -> Complete -> Downloaded -> Deleted`, with
/// `Errored` terminal and reachable from `Submitted` and any `Running` poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Running(u8),
    Complete,
    Downloaded,
    Deleted,
    Errored,
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Running(_) => "running",
            JobState::Complete => "complete",
            JobState::Downloaded => "downloaded",
            JobState::Deleted => "deleted",
            JobState::Errored => "errored",
        }
    }

    /// Apply a polled progress value. Only legal before completion.
    pub fn record_progress(self, progress: Progress) -> Result<JobState, JobStateError> {
        match self {
            JobState::Submitted | JobState::Running(_) => {
                if progress.is_complete() {
                    Ok(JobState::Complete)
                } else {
                    Ok(JobState::Running(progress.percent()))
                }
            }
            other => Err(JobStateError {
                state: other.name(),
                event: "record_progress",
            }),
        }
    }

    /// Only a job observed at 100% may be downloaded.
    pub fn mark_downloaded(self) -> Result<JobState, JobStateError> {
        match self {
            JobState::Complete => Ok(JobState::Downloaded),
            other => Err(JobStateError {
                state: other.name(),
                event: "mark_downloaded",
            }),
        }
    }

    /// Remote cleanup happens after the payload is safely downloaded.
    pub fn mark_deleted(self) -> Result<JobState, JobStateError> {
        match self {
            JobState::Downloaded => Ok(JobState::Deleted),
            other => Err(JobStateError {
                state: other.name(),
                event: "mark_deleted",
            }),
        }
    }

    /// Any error response moves the job to the terminal `Errored` state.
    pub fn fail(self) -> JobState {
        JobState::Errored
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Deleted | JobState::Errored)
    }
}

/// One `<id>` row extracted from a report table: the `value` attribute plus
/// the child elements as an ordered field map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub value: String,
    pub fields: IndexMap<String, String>,
}

impl ReportRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// The two datasets the poster pipeline consumes, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportData {
    pub botnet_victims: Vec<ReportRecord>,
    pub top_users: Vec<ReportRecord>,
}
