//! Polling of server-side asynchronous jobs.
//!
//! A mutating call that completes asynchronously hands back a [`JobId`]. The
//! [`JobPoller`] fetches the job until it reaches a terminal state:
//!
//! ```text
//! Submitted ──get──▶ Polling ──get──▶ … ──▶ Succeeded
//!                       │                   Failed(code, title, description)
//!                       └── sleep(interval) ◀┘ while Pending | Running
//! ```
//!
//! The platform reports job status in two vocabularies depending on the API
//! version. [`normalize`] is the only place that knows about either of them.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::{PlatformError, RoutingError};
use crate::identifiers::JobId;
use crate::ports::{JobTracker, RawJobError, RawJobStatus};

// ---------------------------------------------------------------------------
// Canonical job state
// ---------------------------------------------------------------------------

/// Failure detail of a job that ended in [`JobState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// Numeric platform error code.
    pub code: i64,
    /// Short error title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
}

impl JobFailure {
    fn unknown() -> Self {
        Self {
            code: 0,
            title: "UnknownError".to_owned(),
            description: "job failed without error detail".to_owned(),
        }
    }
}

impl From<&RawJobError> for JobFailure {
    fn from(error: &RawJobError) -> Self {
        Self {
            code: error.code,
            title: error.title.clone(),
            description: error.description.clone(),
        }
    }
}

impl From<JobFailure> for RoutingError {
    fn from(failure: JobFailure) -> Self {
        Self::JobFailed {
            code: failure.code,
            title: failure.title,
            description: failure.description,
        }
    }
}

/// Canonical state of a job, independent of the API version that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Accepted but not started.
    Pending,
    /// In progress.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully.
    Failed(JobFailure),
}

impl JobState {
    /// Returns `true` for [`JobState::Succeeded`] and [`JobState::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

/// Maps a raw platform job status onto [`JobState`].
///
/// | Legacy status | Enumerated state | [`JobState`] |
/// |---------------|------------------|--------------|
/// | `queued` | | `Pending` |
/// | `running` | `PROCESSING`, `POLLING` | `Running` |
/// | `finished` | `COMPLETE` | `Succeeded` |
/// | `failed` | `FAILED` | `Failed` |
///
/// Matching is case-insensitive. A failed job without error detail is
/// reported as code 0, title `UnknownError`.
///
/// # Errors
///
/// Returns [`PlatformError::Protocol`] for any other status; polling an
/// unrecognised state could otherwise never terminate.
pub fn normalize(status: &RawJobStatus) -> Result<JobState, PlatformError> {
    match status {
        RawJobStatus::Legacy { status, error } => match status.to_ascii_lowercase().as_str() {
            "queued" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "finished" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed(
                error.as_ref().map_or_else(JobFailure::unknown, JobFailure::from),
            )),
            other => Err(PlatformError::protocol(format!(
                "unrecognised job status '{other}'"
            ))),
        },
        RawJobStatus::Enumerated { state, errors } => match state.to_ascii_uppercase().as_str() {
            "PROCESSING" | "POLLING" => Ok(JobState::Running),
            "COMPLETE" => Ok(JobState::Succeeded),
            "FAILED" => Ok(JobState::Failed(
                errors.first().map_or_else(JobFailure::unknown, JobFailure::from),
            )),
            other => Err(PlatformError::protocol(format!(
                "unrecognised job state '{other}'"
            ))),
        },
    }
}

// ---------------------------------------------------------------------------
// Sleeping
// ---------------------------------------------------------------------------

/// Suspends the polling pipeline between two job fetches.
///
/// Injected so tests can observe poll delays without waiting for them.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend execution for `duration` without blocking the worker thread.
    async fn sleep(&self, duration: Duration);
}

/// Tokio timer-backed sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Drives one job to a terminal state.
pub struct JobPoller<'a, J: ?Sized> {
    jobs: &'a J,
    sleeper: &'a dyn Sleeper,
    interval: Duration,
    timeout: Option<Duration>,
}

impl<'a, J> JobPoller<'a, J>
where
    J: JobTracker + ?Sized,
{
    /// Creates a poller that waits `interval` between fetches and never
    /// gives up.
    pub fn new(jobs: &'a J, sleeper: &'a dyn Sleeper, interval: Duration) -> Self {
        Self {
            jobs,
            sleeper,
            interval,
            timeout: None,
        }
    }

    /// Bounds the total time slept between polls.
    ///
    /// The budget counts poll intervals, not wall-clock time, so request
    /// latency is not included.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Polls `job_id` until it succeeds or fails.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::JobFailed`] when the job fails.
    /// - [`RoutingError::JobTimedOut`] when a timeout is set and exhausted.
    /// - [`RoutingError::Platform`] when fetching the job fails or its status
    ///   is not recognised.
    pub async fn wait(&self, job_id: &JobId) -> Result<(), RoutingError> {
        let mut polls: u32 = 0;
        let mut waited = Duration::ZERO;
        loop {
            let job = self.jobs.get_job(job_id).await?;
            polls += 1;
            match normalize(&job.status)? {
                JobState::Pending | JobState::Running => {
                    if let Some(limit) = self.timeout {
                        if waited + self.interval > limit {
                            warn!(job_id = %job_id, polls, ?waited, "Job did not complete in time");
                            return Err(RoutingError::JobTimedOut {
                                job_id: job_id.clone(),
                                waited,
                            });
                        }
                    }
                    debug!(
                        job_id = %job_id,
                        polls,
                        updated_at = ?job.updated_at,
                        "Job still in progress"
                    );
                    self.sleeper.sleep(self.interval).await;
                    waited += self.interval;
                }
                JobState::Succeeded => {
                    info!(job_id = %job_id, polls, "Job completed");
                    return Ok(());
                }
                JobState::Failed(failure) => {
                    warn!(
                        job_id = %job_id,
                        polls,
                        code = failure.code,
                        title = %failure.title,
                        "Job failed"
                    );
                    return Err(failure.into());
                }
            }
        }
    }
}
