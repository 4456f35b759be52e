//! Errors surfaced by the assignment protocol.

use crate::scheduler::SchedulerError;
use crate::task::{
    domain::{TargetId, TaskDomainError},
    ports::TaskRepositoryError,
};
use thiserror::Error;

/// Errors returned by [`super::Coordinator::jobs`].
#[derive(Debug, Clone, Error)]
pub enum CoordinatorError {
    /// The worker name failed validation; nothing was read or written.
    #[error("invalid worker: {0}")]
    InvalidWorker(#[source] TaskDomainError),

    /// A strategy failed and the assignment round was abandoned.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The selected spec references a module missing from the catalog.
    #[error("module {0} not found")]
    ModuleNotFound(TargetId),

    /// Reading or writing tasks failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
}

impl CoordinatorError {
    /// Returns whether the caller supplied bad input.
    #[must_use]
    pub const fn is_invalid_worker(&self) -> bool {
        matches!(self, Self::InvalidWorker(_))
    }
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
