//! Concatenation of several strategies.

use super::ports::{CandidateTask, ScheduleRequest, Scheduler, SchedulerResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Calls each strategy in order and concatenates their proposals verbatim.
///
/// No renormalisation or deduplication happens here. Strategy order acts as
/// the tie-break once the coordinator stable-sorts by priority. The first
/// failing strategy aborts the whole round.
#[derive(Clone, Default)]
pub struct CompositeScheduler {
    strategies: Vec<Arc<dyn Scheduler>>,
}

impl CompositeScheduler {
    /// Creates a composite over `strategies`.
    #[must_use]
    pub const fn new(strategies: Vec<Arc<dyn Scheduler>>) -> Self {
        Self { strategies }
    }

    /// Returns the number of composed strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns whether no strategies are composed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl Scheduler for CompositeScheduler {
    async fn tasks(&self, request: &ScheduleRequest) -> SchedulerResult<Vec<CandidateTask>> {
        let mut candidates = Vec::new();
        for strategy in &self.strategies {
            candidates.extend(strategy.tasks(request).await?);
        }
        Ok(candidates)
    }
}
