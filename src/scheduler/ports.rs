//! Scheduler contract and the read-only store queries strategies run.

use super::Priority;
use crate::task::{
    domain::{TaskSpec, WorkerName},
    ports::{TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A request for candidate work on behalf of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    /// Worker the candidates are proposed for.
    pub worker: WorkerName,
    /// Minimum number of proposals wanted. Strategies may return more or
    /// fewer.
    pub num: usize,
}

/// Prioritised proposal of work. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTask {
    /// Rank on the shared priority scale; higher wins.
    pub priority: Priority,
    /// Work being proposed.
    pub spec: TaskSpec,
}

/// Errors returned by scheduler strategies.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// Reading candidate data from the store failed.
    #[error(transparent)]
    Store(#[from] TaskRepositoryError),
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Proposer of prioritised candidate work.
///
/// Callers must not rely on the cardinality or order of the returned
/// proposals; ordering is imposed by the coordinator.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Proposes candidate tasks for `request.worker`.
    async fn tasks(&self, request: &ScheduleRequest) -> SchedulerResult<Vec<CandidateTask>>;
}

/// A `(commit, module)` pair the worker has not yet benchmarked successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentCommit {
    /// Spec pairing the commit with a module.
    pub spec: TaskSpec,
    /// Commit timestamp.
    pub committed_at: DateTime<Utc>,
}

/// Failed-attempt history of one spec for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSummary {
    /// Spec that failed.
    pub spec: TaskSpec,
    /// Number of attempts that ended in a failure status.
    pub error_count: u32,
    /// Status timestamp of the most recent attempt, failed or not.
    pub last_attempt: DateTime<Utc>,
}

/// Queries scheduler strategies run against the shared store.
///
/// Implementations must be read-only and safe to call concurrently.
#[async_trait]
pub trait CandidateQueries: Send + Sync {
    /// Returns up to `limit` `(commit, module)` pairs with commits no older
    /// than `since` that `worker` has neither completed successfully nor
    /// failed, newest commit first and then by module path.
    ///
    /// Failed specs are left to [`CandidateQueries::failure_summaries`] so
    /// the retry cooloff and error cap govern them.
    async fn untested_recent_commits(
        &self,
        worker: &WorkerName,
        since: DateTime<Utc>,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<RecentCommit>>;

    /// Returns one summary per spec that `worker` has failed at least once
    /// and never completed successfully.
    async fn failure_summaries(
        &self,
        worker: &WorkerName,
    ) -> TaskRepositoryResult<Vec<FailureSummary>>;
}
