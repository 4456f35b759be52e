//! Benchmark targets and commits that specs are built from.

use super::{CommitSha, TargetId, TaskDomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A module whose benchmarks are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchModule {
    id: TargetId,
    path: String,
    version: String,
}

impl BenchModule {
    /// Creates a module record.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyModulePath`] when `path` is empty after
    /// trimming.
    pub fn new(
        id: TargetId,
        path: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, TaskDomainError> {
        let normalized_path = path.into().trim().to_owned();
        if normalized_path.is_empty() {
            return Err(TaskDomainError::EmptyModulePath);
        }
        Ok(Self {
            id,
            path: normalized_path,
            version: version.into().trim().to_owned(),
        })
    }

    /// Returns the module identifier.
    #[must_use]
    pub const fn id(&self) -> TargetId {
        self.id
    }

    /// Returns the import path, e.g. `golang.org/x/benchmarks`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the module version to benchmark against.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// A commit of the toolchain under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit hash.
    pub sha: CommitSha,
    /// Commit timestamp used for age-based prioritisation.
    pub committed_at: DateTime<Utc>,
}

impl Commit {
    /// Creates a commit record.
    #[must_use]
    pub const fn new(sha: CommitSha, committed_at: DateTime<Utc>) -> Self {
        Self { sha, committed_at }
    }
}
