//! Pluggable strategies proposing prioritised candidate work.
//!
//! Strategies are read-only and idempotent: they query the shared store
//! through [`ports::CandidateQueries`] and return [`ports::CandidateTask`]
//! values ranked on the [`Priority`] scale. [`CompositeScheduler`] merges the
//! output of several strategies; the coordinator decides what to assign.

mod composite;
pub mod ports;
mod priority;
mod recent_commits;
mod retry;

pub use composite::CompositeScheduler;
pub use ports::{
    CandidateQueries, CandidateTask, FailureSummary, RecentCommit, ScheduleRequest, Scheduler,
    SchedulerError, SchedulerResult,
};
pub use priority::{Priority, Smoothstep, smoothstep01};
pub use recent_commits::RecentCommitsScheduler;
pub use retry::RetryScheduler;

use crate::config::CoordinatorConfig;
use mockable::Clock;
use std::sync::Arc;

/// Builds the production strategy stack: recent commits, then retries.
///
/// Called once at startup; the result is handed to the coordinator.
#[must_use]
pub fn default_scheduler<Q, C>(
    queries: &Arc<Q>,
    clock: &Arc<C>,
    config: &CoordinatorConfig,
) -> CompositeScheduler
where
    Q: CandidateQueries + 'static,
    C: Clock + Send + Sync + 'static,
{
    CompositeScheduler::new(vec![
        Arc::new(RecentCommitsScheduler::new(
            Arc::clone(queries),
            Arc::clone(clock),
            config.recent_commits,
        )),
        Arc::new(RetryScheduler::new(
            Arc::clone(queries),
            Arc::clone(clock),
            config.retry,
        )),
    ])
}
