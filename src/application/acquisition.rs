//! End-to-end report acquisition
//!
//! Drives one job through the full protocol: login, submit, bounded poll
//! loop, download, clean, parse, best-effort remote delete. The poll loop is
//! an explicit bounded-retry policy rather than an unbounded wait.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::application::errors::AcquisitionError;
use crate::config::{AcquisitionConfig, ReportConfig};
use crate::domain::report::{JobState, ReportData};
use crate::infrastructure::api_clients::{FortiAnalyzerClient, SessionError};
use crate::infrastructure::parsers::{clean_report_xml, parse_report};

/// Fixed-interval, bounded polling policy.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_seconds),
            max_attempts: config.max_poll_attempts,
        }
    }
}

/// Outcome of a successful acquisition.
#[derive(Debug)]
pub struct AcquiredReport {
    pub report: ReportData,
    /// Number of progress polls issued before the job reached 100%.
    pub polls: u32,
    /// Set when the remote delete failed after a successful download; the
    /// orphaned job must be cleaned up manually on the appliance.
    pub cleanup_error: Option<SessionError>,
}

/// Sequences one report job from login to parsed datasets.
pub struct AcquireReportUseCase {
    client: FortiAnalyzerClient,
    policy: PollPolicy,
}

impl AcquireReportUseCase {
    pub fn new(client: FortiAnalyzerClient, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    /// Run the acquisition to completion or the first failure.
    ///
    /// Any session error mid-loop halts the run; progress seen on an earlier
    /// poll is never treated as completion. A delete failure after a
    /// successful download is reported on the result, not as an error.
    pub async fn run(
        &mut self,
        username: &str,
        password: &str,
        report: &ReportConfig,
    ) -> Result<AcquiredReport, AcquisitionError> {
        self.client.login(username, password).await?;

        let task_id = self
            .client
            .submit_report(&report.device, report.layout_id, &report.time_period)
            .await?;

        let mut state = JobState::Submitted;
        let mut polls = 0u32;
        loop {
            if polls >= self.policy.max_attempts {
                error!(
                    task_id = %task_id,
                    attempts = polls,
                    "poll budget exhausted before report completed"
                );
                return Err(AcquisitionError::PollBudgetExhausted {
                    attempts: polls,
                    waited_seconds: self.policy.interval.as_secs()
                        * u64::from(polls.saturating_sub(1)),
                });
            }

            // Any poll error is terminal for the job; the loop must not
            // keep polling or fall through to download.
            let progress = match self.client.report_progress(&task_id).await {
                Ok(progress) => progress,
                Err(e) => {
                    state = state.fail();
                    debug_assert!(state.is_terminal());
                    return Err(e.into());
                }
            };
            polls += 1;
            state = state.record_progress(progress)?;

            if state == JobState::Complete {
                info!(task_id = %task_id, polls, "report generation complete");
                break;
            }
            debug!(
                task_id = %task_id,
                percent = progress.percent(),
                attempt = polls,
                "report generation in progress"
            );
            // No sleep once the budget is spent; exhaustion is reported on
            // the next iteration without waiting a full interval first.
            if polls < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        let raw = self.client.download_report(&task_id).await?;
        state = state.mark_downloaded()?;

        // Delete before parsing so remote cleanup is attempted even when the
        // payload turns out to be malformed.
        let cleanup_error = match self.client.delete_report(&task_id).await {
            Ok(()) => {
                state.mark_deleted()?;
                None
            }
            Err(e) => {
                warn!(
                    task_id = %task_id,
                    error = %e,
                    "failed to delete remote report; clean it up manually on the appliance"
                );
                Some(e)
            }
        };

        let report = parse_report(clean_report_xml(&raw))?;
        Ok(AcquiredReport {
            report,
            polls,
            cleanup_error,
        })
    }
}
