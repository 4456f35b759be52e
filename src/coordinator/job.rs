//! Runnable projection of an assigned task.

use crate::config::RunParameters;
use crate::task::domain::{BenchModule, CommitSha, TaskId};
use std::time::Duration;

/// Module coordinates a worker needs to build the benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobModule {
    /// Module import path.
    pub path: String,
    /// Module version.
    pub version: String,
}

/// Work handed to a worker, computed from a freshly created task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Task tracking this attempt.
    pub task_id: TaskId,
    /// Commit to benchmark against.
    pub commit_sha: CommitSha,
    /// Module to benchmark.
    pub module: JobModule,
    /// Run benchmarks in short mode.
    pub short: bool,
    /// Target duration of each benchmark.
    pub bench_time: Duration,
}

impl Job {
    /// Expands an assignment into a job using `run` parameters.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        commit_sha: CommitSha,
        module: &BenchModule,
        run: RunParameters,
    ) -> Self {
        Self {
            task_id,
            commit_sha,
            module: JobModule {
                path: module.path().to_owned(),
                version: module.version().to_owned(),
            },
            short: run.short,
            bench_time: run.bench_time,
        }
    }
}
