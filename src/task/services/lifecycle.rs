//! Service layer for lifecycle transitions reported by workers and the
//! ingester.

use crate::task::{
    domain::{Datafile, DatafileId, Task, TaskDomainError, TaskId, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// The task has no stored datafile to ingest.
    #[error("task {0} has no uploaded datafile")]
    MissingDatafile(TaskId),
    /// The stored datafile no longer matches its recorded digest.
    #[error("datafile {datafile_id} of task {task_id} failed digest verification")]
    DatafileDigestMismatch {
        /// Task being completed.
        task_id: TaskId,
        /// Datafile whose digest did not match.
        datafile_id: DatafileId,
    },
}

impl TaskLifecycleError {
    /// Returns whether the error reports a failed compare-and-set.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Repository(err) if err.is_conflict())
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
///
/// Each operation is a single compare-and-set transition except
/// [`TaskLifecycleService::upload`], which chains two.
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> Clone for TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Retrieves a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the lookup fails.
    pub async fn find_by_id(&self, task_id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.repository.find_by_id(task_id).await?)
    }

    /// Records that the worker started executing the task
    /// (`created -> in_progress`).
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] for unknown tasks and
    /// transition conflicts.
    pub async fn start(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.transition(task_id, &[TaskStatus::Created], TaskStatus::InProgress)
            .await
    }

    /// Records that execution failed (`in_progress -> complete_error`).
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] for unknown tasks and
    /// transition conflicts.
    pub async fn fail(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.transition(task_id, &[TaskStatus::InProgress], TaskStatus::CompleteError)
            .await
    }

    /// Records that the worker abandoned the task (any pending status ->
    /// `halted`).
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] for unknown tasks and
    /// transition conflicts.
    pub async fn halt(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.transition(task_id, &TaskStatus::PENDING, TaskStatus::Halted)
            .await
    }

    /// Records that the worker began uploading output
    /// (`in_progress -> result_upload_started`).
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] for unknown tasks and
    /// transition conflicts.
    pub async fn begin_upload(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.transition(
            task_id,
            &[TaskStatus::InProgress],
            TaskStatus::ResultUploadStarted,
        )
        .await
    }

    /// Stores `contents` as a datafile and binds it to the task
    /// (`result_upload_started -> result_uploaded`), all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] for unknown tasks,
    /// transition conflicts, and storage failures.
    pub async fn record_upload(
        &self,
        task_id: TaskId,
        contents: Vec<u8>,
    ) -> TaskLifecycleResult<Task> {
        let datafile = Datafile::new(contents, &*self.clock);
        Ok(self
            .repository
            .record_data_upload(task_id, &datafile)
            .await?)
    }

    /// Begins and completes an upload in one call.
    ///
    /// If storing fails after the upload began, the task stays in
    /// `result_upload_started` until the worker halts it or the reaper times
    /// it out.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::begin_upload`] and
    /// [`Self::record_upload`].
    pub async fn upload(&self, task_id: TaskId, contents: Vec<u8>) -> TaskLifecycleResult<Task> {
        self.begin_upload(task_id).await?;
        self.record_upload(task_id, contents).await
    }

    /// Marks uploaded results as ingested (`result_uploaded ->
    /// complete_success`) after re-verifying the datafile digest.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`],
    /// [`TaskLifecycleError::MissingDatafile`],
    /// [`TaskLifecycleError::DatafileDigestMismatch`], or repository errors.
    /// The task is not mutated on any error.
    pub async fn complete(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let task = self
            .repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))?;
        let datafile_id = task
            .datafile_id()
            .ok_or(TaskLifecycleError::MissingDatafile(task_id))?;
        let datafile = self
            .repository
            .find_datafile(datafile_id)
            .await?
            .ok_or(TaskLifecycleError::MissingDatafile(task_id))?;

        if !datafile.verify() {
            return Err(TaskLifecycleError::DatafileDigestMismatch {
                task_id,
                datafile_id,
            });
        }

        self.transition(
            task_id,
            &[TaskStatus::ResultUploaded],
            TaskStatus::CompleteSuccess,
        )
        .await
    }

    async fn transition(
        &self,
        task_id: TaskId,
        from: &[TaskStatus],
        to: TaskStatus,
    ) -> TaskLifecycleResult<Task> {
        Ok(self
            .repository
            .transition_status(task_id, from, to)
            .await?)
    }
}
