//! In-process coordinator client.

use super::ports::{ClientError, ClientResult, CoordinatorClient};
use crate::coordinator::{Coordinator, CoordinatorError, Job};
use crate::task::{
    domain::{TaskDomainError, TaskId},
    ports::{ModuleResolver, TaskRepository, TaskRepositoryError},
    services::{TaskLifecycleError, TaskLifecycleService},
};
use async_trait::async_trait;
use mockable::Clock;

/// Calls the coordinator and lifecycle service directly.
///
/// Backs the HTTP server and lets a worker share a process with the
/// coordinator.
pub struct LocalCoordinatorClient<R, M, C>
where
    R: TaskRepository,
    M: ModuleResolver,
    C: Clock + Send + Sync,
{
    coordinator: Coordinator<R, M>,
    lifecycle: TaskLifecycleService<R, C>,
}

impl<R, M, C> LocalCoordinatorClient<R, M, C>
where
    R: TaskRepository,
    M: ModuleResolver,
    C: Clock + Send + Sync,
{
    /// Creates a client over an existing coordinator and lifecycle service.
    #[must_use]
    pub const fn new(
        coordinator: Coordinator<R, M>,
        lifecycle: TaskLifecycleService<R, C>,
    ) -> Self {
        Self {
            coordinator,
            lifecycle,
        }
    }
}

#[async_trait]
impl<R, M, C> CoordinatorClient for LocalCoordinatorClient<R, M, C>
where
    R: TaskRepository,
    M: ModuleResolver,
    C: Clock + Send + Sync,
{
    async fn jobs(&self, worker: &str) -> ClientResult<Vec<Job>> {
        Ok(self.coordinator.jobs(worker).await?)
    }

    async fn start(&self, task_id: TaskId) -> ClientResult<()> {
        self.lifecycle.start(task_id).await?;
        Ok(())
    }

    async fn fail(&self, task_id: TaskId) -> ClientResult<()> {
        self.lifecycle.fail(task_id).await?;
        Ok(())
    }

    async fn halt(&self, task_id: TaskId) -> ClientResult<()> {
        self.lifecycle.halt(task_id).await?;
        Ok(())
    }

    async fn upload(&self, task_id: TaskId, contents: Vec<u8>) -> ClientResult<()> {
        self.lifecycle.upload(task_id, contents).await?;
        Ok(())
    }
}

impl From<CoordinatorError> for ClientError {
    fn from(err: CoordinatorError) -> Self {
        let message = err.to_string();
        match err {
            CoordinatorError::InvalidWorker(_) => Self::InvalidWorker(message),
            CoordinatorError::ModuleNotFound(_) => Self::NotFound(message),
            CoordinatorError::Scheduler(_) | CoordinatorError::Repository(_) => {
                Self::Internal(message)
            }
        }
    }
}

impl From<TaskRepositoryError> for ClientError {
    fn from(err: TaskRepositoryError) -> Self {
        let message = err.to_string();
        match err {
            TaskRepositoryError::NotFound(_) => Self::NotFound(message),
            TaskRepositoryError::TransitionConflict { .. }
            | TaskRepositoryError::InvalidTransition(_) => Self::Conflict(message),
            TaskRepositoryError::DuplicateDatafile(_) | TaskRepositoryError::Persistence(_) => {
                Self::Internal(message)
            }
        }
    }
}

impl From<TaskLifecycleError> for ClientError {
    fn from(err: TaskLifecycleError) -> Self {
        match err {
            TaskLifecycleError::Repository(inner) => inner.into(),
            TaskLifecycleError::NotFound(_) => Self::NotFound(err.to_string()),
            TaskLifecycleError::Domain(
                TaskDomainError::StatusConflict { .. }
                | TaskDomainError::InvalidStatusTransition { .. },
            )
            | TaskLifecycleError::MissingDatafile(_)
            | TaskLifecycleError::DatafileDigestMismatch { .. } => Self::Conflict(err.to_string()),
            TaskLifecycleError::Domain(_) => Self::Internal(err.to_string()),
        }
    }
}
