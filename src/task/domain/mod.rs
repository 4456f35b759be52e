//! Domain model for benchmark task assignment and lifecycle.
//!
//! A [`TaskSpec`] names a unit of work (a module at a commit); a [`Task`] is
//! one worker's attempt at it, moving through [`TaskStatus`] only by
//! compare-and-set transitions. Infrastructure concerns stay outside this
//! boundary.

mod datafile;
mod error;
mod ids;
mod spec;
mod status;
mod target;
mod task;
mod worker;

pub use datafile::Datafile;
pub use error::{ParseTaskKindError, ParseTaskStatusError, TaskDomainError};
pub use ids::{DatafileId, TargetId, TaskId};
pub use spec::{CommitSha, TaskKind, TaskSpec};
pub use status::TaskStatus;
pub use target::{BenchModule, Commit};
pub use task::{PersistedTaskData, Task, next_status_timestamp};
pub use worker::WorkerName;
