//! Strategy proposing recent commits the worker has not yet benchmarked.

use super::{
    Priority, Smoothstep,
    ports::{CandidateQueries, CandidateTask, ScheduleRequest, Scheduler, SchedulerResult},
};
use crate::config::RecentCommitsConfig;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Proposes `(commit, module)` pairs inside the recent window that the
/// requesting worker has neither completed nor failed. Failures are the
/// retry strategy's business.
///
/// Priority decays smoothly with commit age from [`Priority::HIGH`] at
/// `high_age` to [`Priority::IDLE`] at `idle_age`.
pub struct RecentCommitsScheduler<Q, C>
where
    Q: CandidateQueries,
    C: Clock + Send + Sync,
{
    queries: Arc<Q>,
    clock: Arc<C>,
    window: Duration,
    curve: Smoothstep,
}

impl<Q, C> RecentCommitsScheduler<Q, C>
where
    Q: CandidateQueries,
    C: Clock + Send + Sync,
{
    /// Creates the strategy.
    #[must_use]
    pub fn new(queries: Arc<Q>, clock: Arc<C>, config: RecentCommitsConfig) -> Self {
        Self {
            queries,
            clock,
            window: config.window,
            curve: Smoothstep::between(
                config.high_age.as_secs_f64(),
                config.idle_age.as_secs_f64(),
                Priority::HIGH,
                Priority::IDLE,
            ),
        }
    }

    /// Returns the priority of a commit made at `committed_at`.
    ///
    /// Commits dated in the future count as brand new.
    #[must_use]
    pub fn priority_at(&self, now: DateTime<Utc>, committed_at: DateTime<Utc>) -> Priority {
        let age = now
            .signed_duration_since(committed_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.curve.priority(age.as_secs_f64())
    }
}

#[async_trait]
impl<Q, C> Scheduler for RecentCommitsScheduler<Q, C>
where
    Q: CandidateQueries,
    C: Clock + Send + Sync,
{
    async fn tasks(&self, request: &ScheduleRequest) -> SchedulerResult<Vec<CandidateTask>> {
        let now = self.clock.utc();
        let window = TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX);
        let since = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let commits = self
            .queries
            .untested_recent_commits(&request.worker, since, request.num)
            .await?;

        Ok(commits
            .into_iter()
            .map(|commit| CandidateTask {
                priority: self.priority_at(now, commit.committed_at),
                spec: commit.spec,
            })
            .collect())
    }
}
