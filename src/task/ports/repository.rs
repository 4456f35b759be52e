//! Repository port for task persistence and compare-and-set transitions.

use crate::task::domain::{
    Datafile, DatafileId, Task, TaskDomainError, TaskId, TaskSpec, TaskStatus, WorkerName,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
///
/// [`TaskRepository::transition_status`] is the only way a stored task's
/// status changes; implementations must apply the status check and the
/// update atomically with respect to every other call on the same task.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persists a new task in `created` status bound to `worker` and `spec`.
    ///
    /// The repository generates the task identifier and initial timestamp.
    async fn create(&self, worker: &WorkerName, spec: &TaskSpec) -> TaskRepositoryResult<Task>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns the worker's tasks whose status is one of `statuses`.
    async fn list_worker_tasks_with_status(
        &self,
        worker: &WorkerName,
        statuses: &[TaskStatus],
    ) -> TaskRepositoryResult<Vec<Task>>;

    /// Moves a task to `to` if its current status is one of `from`.
    ///
    /// Status and `last_status_update` are updated together. Returns the
    /// updated task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for an unknown task and
    /// [`TaskRepositoryError::TransitionConflict`] when the current status is
    /// not in `from`; no mutation happens in either case.
    async fn transition_status(
        &self,
        id: TaskId,
        from: &[TaskStatus],
        to: TaskStatus,
    ) -> TaskRepositoryResult<Task>;

    /// Stores `datafile`, binds it to the task, and moves the task from
    /// `result_upload_started` to `result_uploaded`, as one unit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`],
    /// [`TaskRepositoryError::TransitionConflict`], or
    /// [`TaskRepositoryError::DuplicateDatafile`]; none of the three effects
    /// is observable after a failure.
    async fn record_data_upload(&self, id: TaskId, datafile: &Datafile)
    -> TaskRepositoryResult<Task>;

    /// Finds an uploaded datafile by identifier.
    async fn find_datafile(&self, id: DatafileId) -> TaskRepositoryResult<Option<Datafile>>;

    /// Moves every `in_progress` or `result_upload_started` task whose last
    /// status update is older than `before` to `stale_timeout`.
    ///
    /// Returns the identifiers of the swept tasks.
    async fn timeout_stale_tasks(&self, before: DateTime<Utc>) -> TaskRepositoryResult<Vec<TaskId>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task's status was not in the expected source set. No mutation
    /// occurred.
    #[error("transition conflict for task {task_id}: status is {current}, cannot move to {to}")]
    TransitionConflict {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Status observed by the store.
        current: TaskStatus,
        /// Requested target status.
        to: TaskStatus,
    },

    /// The requested transition is not part of the task lifecycle.
    #[error(transparent)]
    InvalidTransition(TaskDomainError),

    /// A datafile with the same identifier already exists.
    #[error("duplicate datafile identifier: {0}")]
    DuplicateDatafile(DatafileId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns whether the error reports a failed compare-and-set.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::TransitionConflict { .. })
    }
}

impl From<TaskDomainError> for TaskRepositoryError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::StatusConflict {
                task_id,
                current,
                to,
            } => Self::TransitionConflict {
                task_id,
                current,
                to,
            },
            other => Self::InvalidTransition(other),
        }
    }
}
