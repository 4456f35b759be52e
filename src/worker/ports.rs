//! Ports the worker loop drives: the coordinator and the benchmark runner.

use crate::coordinator::Job;
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Errors reported by a [`CoordinatorClient`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The coordinator rejected the worker name.
    #[error("invalid worker: {0}")]
    InvalidWorker(String),
    /// The task or its target does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The task was not in a status the report applies to.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The coordinator could not be reached or answered garbage.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The coordinator failed internally.
    #[error("coordinator failure: {0}")]
    Internal(String),
}

impl ClientError {
    /// Returns whether retrying the same request can never succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::InvalidWorker(_))
    }
}

/// Result type for coordinator client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// The worker's view of the coordinator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    /// Polls for new jobs. An empty vector is a normal outcome.
    async fn jobs(&self, worker: &str) -> ClientResult<Vec<Job>>;

    /// Reports that execution started (`created -> in_progress`).
    async fn start(&self, task_id: TaskId) -> ClientResult<()>;

    /// Reports that execution failed (`in_progress -> complete_error`).
    async fn fail(&self, task_id: TaskId) -> ClientResult<()>;

    /// Abandons the task (any pending status -> `halted`).
    async fn halt(&self, task_id: TaskId) -> ClientResult<()>;

    /// Uploads the result output, ending in `result_uploaded`.
    async fn upload(&self, task_id: TaskId, contents: Vec<u8>) -> ClientResult<()>;
}

/// Readable benchmark output produced by a [`Processor`].
pub type ResultStream = Pin<Box<dyn AsyncRead + Send>>;

/// Errors raised while executing a job.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Spawning the runner or reading its output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The runner exited unsuccessfully.
    #[error("benchmark runner exited with {status}: {stderr}")]
    Exit {
        /// Exit status description.
        status: String,
        /// Captured standard error, lossily decoded.
        stderr: String,
    },
}

/// Executes a job and hands back its output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Processor: Send + Sync {
    /// Runs `job` to completion.
    async fn run(&self, job: &Job) -> Result<ResultStream, ProcessorError>;
}
