//! Single assignment authority matching scheduler proposals to workers.
//!
//! Every poll runs [`Coordinator::jobs`] independently. The only shared state
//! is the task store, so concurrent polls from the same worker can both
//! assign the same spec; the stale reaper eventually retires the loser.

mod error;
mod job;
mod service;

pub use error::{CoordinatorError, CoordinatorResult};
pub use job::{Job, JobModule};
pub use service::Coordinator;
