//! Task entity: one attempt of a spec by one worker.

use super::{DatafileId, TaskDomainError, TaskId, TaskSpec, TaskStatus, WorkerName};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// One attempt at a [`TaskSpec`] by one named worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    worker: WorkerName,
    spec: TaskSpec,
    status: TaskStatus,
    last_status_update: DateTime<Utc>,
    datafile_id: Option<DatafileId>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Worker the task is bound to.
    pub worker: WorkerName,
    /// Work the task attempts.
    pub spec: TaskSpec,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Timestamp of the latest status transition.
    pub last_status_update: DateTime<Utc>,
    /// Bound result datafile, if uploaded.
    pub datafile_id: Option<DatafileId>,
}

impl Task {
    /// Creates a freshly assigned task in [`TaskStatus::Created`].
    #[must_use]
    pub fn new(worker: WorkerName, spec: TaskSpec, clock: &impl Clock) -> Self {
        Self {
            id: TaskId::new(),
            worker,
            spec,
            status: TaskStatus::Created,
            last_status_update: clock.utc(),
            datafile_id: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            worker: data.worker,
            spec: data.spec,
            status: data.status,
            last_status_update: data.last_status_update,
            datafile_id: data.datafile_id,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the worker the task is bound to.
    #[must_use]
    pub const fn worker(&self) -> &WorkerName {
        &self.worker
    }

    /// Returns the attempted spec.
    #[must_use]
    pub const fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the timestamp of the latest status transition.
    #[must_use]
    pub const fn last_status_update(&self) -> DateTime<Utc> {
        self.last_status_update
    }

    /// Returns the bound datafile, if any.
    #[must_use]
    pub const fn datafile_id(&self) -> Option<DatafileId> {
        self.datafile_id
    }

    /// Moves the task to `to` if its current status is one of `from`.
    ///
    /// The status and `last_status_update` change together or not at all.
    /// The new timestamp is strictly later than the previous one even when
    /// `now` is not.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::StatusConflict`] when the current status
    /// is not in `from`, or [`TaskDomainError::InvalidStatusTransition`] when
    /// the lifecycle forbids the move. The task is unchanged in both cases.
    pub fn transition(
        &mut self,
        from: &[TaskStatus],
        to: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if !from.contains(&self.status) {
            return Err(TaskDomainError::StatusConflict {
                task_id: self.id,
                current: self.status,
                to,
            });
        }

        if !self.status.can_transition_to(to) {
            return Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to,
            });
        }

        self.status = to;
        self.last_status_update = next_status_timestamp(self.last_status_update, now);
        Ok(())
    }

    /// Binds an uploaded datafile and completes the upload transition.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Task::transition`] for
    /// `result_upload_started -> result_uploaded`; the datafile is not bound
    /// on failure.
    pub fn bind_datafile(
        &mut self,
        datafile_id: DatafileId,
        now: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.transition(
            &[TaskStatus::ResultUploadStarted],
            TaskStatus::ResultUploaded,
            now,
        )?;
        self.datafile_id = Some(datafile_id);
        Ok(())
    }
}

/// Returns the timestamp to record for a transition observed at `now`.
#[must_use]
pub fn next_status_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}
