//! JSON bodies exchanged between workers and the coordinator.

use crate::coordinator::{Job, JobModule};
use crate::task::domain::{CommitSha, TaskDomainError, TaskId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Body of `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsRequest {
    /// Polling worker's name.
    pub worker: String,
}

/// Response of `POST /jobs`. An empty list is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsResponse {
    /// Assigned jobs.
    pub jobs: Vec<WireJob>,
}

/// Module coordinates on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireModule {
    /// Module import path.
    pub path: String,
    /// Module version.
    pub version: String,
}

/// Job as serialised for workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireJob {
    /// Task identifier.
    pub task_uuid: Uuid,
    /// 40-character commit hash.
    pub commit_sha: String,
    /// Module to benchmark.
    pub module: WireModule,
    /// Short-mode flag.
    pub short: bool,
    /// Per-benchmark target duration in nanoseconds.
    pub benchtime_ns: u64,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub error: String,
}

impl From<&Job> for WireJob {
    fn from(job: &Job) -> Self {
        Self {
            task_uuid: job.task_id.into_inner(),
            commit_sha: job.commit_sha.as_str().to_owned(),
            module: WireModule {
                path: job.module.path.clone(),
                version: job.module.version.clone(),
            },
            short: job.short,
            benchtime_ns: u64::try_from(job.bench_time.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

impl TryFrom<WireJob> for Job {
    type Error = TaskDomainError;

    fn try_from(wire: WireJob) -> Result<Self, Self::Error> {
        Ok(Self {
            task_id: TaskId::from_uuid(wire.task_uuid),
            commit_sha: CommitSha::new(wire.commit_sha)?,
            module: JobModule {
                path: wire.module.path,
                version: wire.module.version,
            },
            short: wire.short,
            bench_time: Duration::from_nanos(wire.benchtime_ns),
        })
    }
}
