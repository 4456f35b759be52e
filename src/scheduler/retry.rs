//! Strategy re-proposing specs that failed, until they fail too often.

use super::{
    Priority, Smoothstep,
    ports::{CandidateQueries, CandidateTask, ScheduleRequest, Scheduler, SchedulerResult},
};
use crate::config::RetryConfig;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;

/// Proposes specs with at least one and fewer than `max_errors` failed
/// attempts whose last attempt is older than the cooloff.
///
/// Priority decays from [`Priority::HIGHEST`] at one error to
/// [`Priority::MIN`] at `max_errors`.
pub struct RetryScheduler<Q, C>
where
    Q: CandidateQueries,
    C: Clock + Send + Sync,
{
    queries: Arc<Q>,
    clock: Arc<C>,
    config: RetryConfig,
    curve: Smoothstep,
}

impl<Q, C> RetryScheduler<Q, C>
where
    Q: CandidateQueries,
    C: Clock + Send + Sync,
{
    /// Creates the strategy.
    #[must_use]
    pub fn new(queries: Arc<Q>, clock: Arc<C>, config: RetryConfig) -> Self {
        Self {
            queries,
            clock,
            config,
            curve: Smoothstep::between(
                1.0,
                f64::from(config.max_errors),
                Priority::HIGHEST,
                Priority::MIN,
            ),
        }
    }

    /// Returns the priority of a spec with `error_count` failed attempts.
    #[must_use]
    pub fn priority_for(&self, error_count: u32) -> Priority {
        self.curve.priority(f64::from(error_count))
    }

    fn is_eligible(
        &self,
        error_count: u32,
        last_attempt: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> bool {
        error_count >= 1 && error_count < self.config.max_errors && last_attempt <= cutoff
    }
}

#[async_trait]
impl<Q, C> Scheduler for RetryScheduler<Q, C>
where
    Q: CandidateQueries,
    C: Clock + Send + Sync,
{
    async fn tasks(&self, request: &ScheduleRequest) -> SchedulerResult<Vec<CandidateTask>> {
        let cooloff = TimeDelta::from_std(self.config.cooloff).unwrap_or(TimeDelta::MAX);
        let cutoff = self
            .clock
            .utc()
            .checked_sub_signed(cooloff)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let summaries = self.queries.failure_summaries(&request.worker).await?;

        let mut candidates: Vec<CandidateTask> = summaries
            .into_iter()
            .filter(|summary| self.is_eligible(summary.error_count, summary.last_attempt, cutoff))
            .map(|summary| CandidateTask {
                priority: self.priority_for(summary.error_count),
                spec: summary.spec,
            })
            .collect();
        candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        candidates.truncate(request.num);
        Ok(candidates)
    }
}
