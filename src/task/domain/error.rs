//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The worker name is empty.
    #[error("worker name must not be empty")]
    EmptyWorkerName,

    /// The worker name does not match `[a-z][a-z0-9-]*`.
    #[error(
        "invalid worker name '{0}', expected a lowercase letter followed by lowercase letters, digits, or hyphens"
    )]
    InvalidWorkerName(String),

    /// The worker name exceeds the 100-character storage limit.
    #[error("worker name exceeds 100 character limit: {0}")]
    WorkerNameTooLong(String),

    /// The commit SHA is not 40 hexadecimal characters.
    #[error("invalid commit sha '{0}', expected 40 hexadecimal characters")]
    InvalidCommitSha(String),

    /// The module path is empty after trimming.
    #[error("module path must not be empty")]
    EmptyModulePath,

    /// The task's current status is not in the expected source set.
    #[error("task {task_id} is {current}, cannot move to {to}")]
    StatusConflict {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Status observed when the transition was attempted.
        current: TaskStatus,
        /// Requested target status.
        to: TaskStatus,
    },

    /// The lifecycle does not permit the requested transition.
    #[error("invalid status transition for task {task_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested target status.
        to: TaskStatus,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task kind: {0}")]
pub struct ParseTaskKindError(pub String);
