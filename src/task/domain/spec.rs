//! Task specification value objects describing what work is.

use super::{ParseTaskKindError, TargetId, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a full hexadecimal commit hash.
const COMMIT_SHA_LENGTH: usize = 40;

/// Kind of benchmark target a spec refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Benchmarks of a single module at a commit.
    Module,
}

impl TaskKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskKind {
    type Error = ParseTaskKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "module" => Ok(Self::Module),
            _ => Err(ParseTaskKindError(value.to_owned())),
        }
    }
}

/// Full 40-character hexadecimal commit hash, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitSha(String);

impl CommitSha {
    /// Creates a validated commit hash.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidCommitSha`] when the value is not
    /// exactly 40 hexadecimal characters.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        let is_valid = normalized.len() == COMMIT_SHA_LENGTH
            && normalized.chars().all(|c| c.is_ascii_hexdigit());

        if !is_valid {
            return Err(TaskDomainError::InvalidCommitSha(raw));
        }

        Ok(Self(normalized))
    }

    /// Returns the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitSha {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommitSha> for String {
    fn from(value: CommitSha) -> Self {
        value.0
    }
}

impl AsRef<str> for CommitSha {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity-free description of a unit of benchmark work.
///
/// Two specs are equal when kind, target, and commit all match. Many task
/// attempts may share one spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskSpec {
    kind: TaskKind,
    target_id: TargetId,
    commit_sha: CommitSha,
}

impl TaskSpec {
    /// Creates a spec for benchmarking `module` at `commit_sha`.
    #[must_use]
    pub const fn module(target_id: TargetId, commit_sha: CommitSha) -> Self {
        Self {
            kind: TaskKind::Module,
            target_id,
            commit_sha,
        }
    }

    /// Creates a spec from persisted parts.
    #[must_use]
    pub const fn from_parts(kind: TaskKind, target_id: TargetId, commit_sha: CommitSha) -> Self {
        Self {
            kind,
            target_id,
            commit_sha,
        }
    }

    /// Returns the target kind.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the target identifier.
    #[must_use]
    pub const fn target_id(&self) -> TargetId {
        self.target_id
    }

    /// Returns the commit hash.
    #[must_use]
    pub const fn commit_sha(&self) -> &CommitSha {
        &self.commit_sha
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.kind, self.target_id, self.commit_sha)
    }
}
