//! Task status state machine.

use super::ParseTaskStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of one task attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Assigned to a worker but not yet started.
    Created,
    /// The worker is executing the benchmark.
    InProgress,
    /// The worker has started uploading results.
    ResultUploadStarted,
    /// Results are stored and bound to the task, awaiting ingestion.
    ResultUploaded,
    /// Results were ingested.
    CompleteSuccess,
    /// Benchmark execution failed.
    CompleteError,
    /// The worker gave up on the task.
    Halted,
    /// The task was abandoned and swept by the stale reaper.
    StaleTimeout,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Created,
        Self::InProgress,
        Self::ResultUploadStarted,
        Self::ResultUploaded,
        Self::CompleteSuccess,
        Self::CompleteError,
        Self::Halted,
        Self::StaleTimeout,
    ];

    /// Statuses that count as work already claimed by a worker.
    pub const PENDING: [Self; 4] = [
        Self::Created,
        Self::InProgress,
        Self::ResultUploadStarted,
        Self::ResultUploaded,
    ];

    /// Terminal statuses that count as a failed attempt.
    pub const FAILED: [Self; 3] = [Self::CompleteError, Self::Halted, Self::StaleTimeout];

    /// In-flight statuses the stale reaper may time out.
    pub const STALE_CANDIDATES: [Self; 2] = [Self::InProgress, Self::ResultUploadStarted];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::ResultUploadStarted => "result_upload_started",
            Self::ResultUploaded => "result_uploaded",
            Self::CompleteSuccess => "complete_success",
            Self::CompleteError => "complete_error",
            Self::Halted => "halted",
            Self::StaleTimeout => "stale_timeout",
        }
    }

    /// Returns whether no further transition may leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::Created | Self::InProgress | Self::ResultUploadStarted | Self::ResultUploaded => {
                false
            }
            Self::CompleteSuccess | Self::CompleteError | Self::Halted | Self::StaleTimeout => true,
        }
    }

    /// Returns whether the status is in the pending set.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        match self {
            Self::Created | Self::InProgress | Self::ResultUploadStarted | Self::ResultUploaded => {
                true
            }
            Self::CompleteSuccess | Self::CompleteError | Self::Halted | Self::StaleTimeout => false,
        }
    }

    /// Returns whether the status records a failed attempt.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        match self {
            Self::CompleteError | Self::Halted | Self::StaleTimeout => true,
            Self::Created
            | Self::InProgress
            | Self::ResultUploadStarted
            | Self::ResultUploaded
            | Self::CompleteSuccess => false,
        }
    }

    /// Returns whether the lifecycle allows moving from this status to
    /// `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Created, Self::InProgress)
            | (Self::InProgress, Self::ResultUploadStarted | Self::CompleteError)
            | (Self::ResultUploadStarted, Self::ResultUploaded)
            | (Self::ResultUploaded, Self::CompleteSuccess)
            | (Self::InProgress | Self::ResultUploadStarted, Self::StaleTimeout) => true,
            (from, Self::Halted) => from.is_pending(),
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "in_progress" => Ok(Self::InProgress),
            "result_upload_started" => Ok(Self::ResultUploadStarted),
            "result_uploaded" => Ok(Self::ResultUploaded),
            "complete_success" => Ok(Self::CompleteSuccess),
            "complete_error" => Ok(Self::CompleteError),
            "halted" => Ok(Self::Halted),
            "stale_timeout" => Ok(Self::StaleTimeout),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}
