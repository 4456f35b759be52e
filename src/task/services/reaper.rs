//! Periodic sweep that times out abandoned in-flight tasks.

use crate::config::ReaperConfig;
use crate::task::{
    domain::TaskId,
    ports::{TaskRepository, TaskRepositoryResult},
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Time-based reaper for tasks whose worker went silent.
///
/// Any `in_progress` or `result_upload_started` task whose last status
/// update predates `now - timeout` is moved to `stale_timeout`. Workers send
/// no heartbeat; a long-running benchmark that outlives the timeout is
/// reaped too, and its later reports fail with a transition conflict.
pub struct StaleTaskReaper<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    config: ReaperConfig,
}

impl<R, C> StaleTaskReaper<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a reaper.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>, config: ReaperConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Returns the instant before which in-flight tasks count as stale.
    #[must_use]
    pub fn cutoff(&self) -> DateTime<Utc> {
        let timeout = TimeDelta::from_std(self.config.timeout).unwrap_or(TimeDelta::MAX);
        self.clock
            .utc()
            .checked_sub_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Runs one sweep and returns the identifiers of the timed-out tasks.
    ///
    /// # Errors
    ///
    /// Returns repository errors unchanged.
    pub async fn sweep(&self) -> TaskRepositoryResult<Vec<TaskId>> {
        let cutoff = self.cutoff();
        let swept = self.repository.timeout_stale_tasks(cutoff).await?;
        if swept.is_empty() {
            debug!(%cutoff, "stale sweep found nothing");
        } else {
            info!(%cutoff, count = swept.len(), "timed out stale tasks");
        }
        Ok(swept)
    }

    /// Sweeps every `interval` until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first store failure.
    pub async fn run(&self, shutdown: CancellationToken) -> TaskRepositoryResult<()> {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            if let Err(err) = self.sweep().await {
                error!(error = %err, "stale sweep failed");
                return Err(err);
            }
        }
    }
}
