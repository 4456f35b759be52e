//! Assignment protocol.

use super::{CoordinatorError, CoordinatorResult, Job};
use crate::config::RunParameters;
use crate::scheduler::{CandidateTask, ScheduleRequest, Scheduler};
use crate::task::{
    domain::{TaskSpec, TaskStatus, WorkerName},
    ports::{ModuleResolver, TaskRepository},
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Assigns work to polling workers.
///
/// Holds no mutable state of its own; every call reads the worker's pending
/// tasks afresh.
pub struct Coordinator<R, M>
where
    R: TaskRepository,
    M: ModuleResolver,
{
    repository: Arc<R>,
    modules: Arc<M>,
    scheduler: Arc<dyn Scheduler>,
    run: RunParameters,
}

impl<R, M> Clone for Coordinator<R, M>
where
    R: TaskRepository,
    M: ModuleResolver,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            modules: Arc::clone(&self.modules),
            scheduler: Arc::clone(&self.scheduler),
            run: self.run,
        }
    }
}

impl<R, M> Coordinator<R, M>
where
    R: TaskRepository,
    M: ModuleResolver,
{
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        modules: Arc<M>,
        scheduler: Arc<dyn Scheduler>,
        run: RunParameters,
    ) -> Self {
        Self {
            repository,
            modules,
            scheduler,
            run,
        }
    }

    /// Returns at most one new job for `worker`.
    ///
    /// Proposals are stable-sorted by descending priority and the first
    /// whose spec is not already pending for the worker is assigned. The
    /// scheduler is asked for one more proposal than there are pending
    /// tasks, so a fresh candidate survives the filter whenever one exists.
    /// An empty vector means there is nothing new to do.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidWorker`] before touching the store
    /// when the name is malformed, [`CoordinatorError::Scheduler`] when any
    /// strategy fails, [`CoordinatorError::ModuleNotFound`] when the chosen
    /// spec cannot be expanded, and [`CoordinatorError::Repository`] for
    /// store failures.
    pub async fn jobs(&self, worker: &str) -> CoordinatorResult<Vec<Job>> {
        let worker_name = WorkerName::new(worker).map_err(CoordinatorError::InvalidWorker)?;

        let pending = self
            .repository
            .list_worker_tasks_with_status(&worker_name, &TaskStatus::PENDING)
            .await?;
        let pending_specs: HashSet<&TaskSpec> = pending.iter().map(|task| task.spec()).collect();

        let request = ScheduleRequest {
            worker: worker_name.clone(),
            num: pending.len().saturating_add(1),
        };
        let mut candidates = self.scheduler.tasks(&request).await?;
        candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));

        let Some(CandidateTask { priority, spec }) = candidates
            .into_iter()
            .find(|candidate| !pending_specs.contains(&candidate.spec))
        else {
            debug!(worker = %worker_name, pending = pending.len(), "no assignable candidate");
            return Ok(Vec::new());
        };

        let module = self
            .modules
            .find_module_by_id(spec.target_id())
            .await?
            .ok_or(CoordinatorError::ModuleNotFound(spec.target_id()))?;

        let task = self.repository.create(&worker_name, &spec).await?;
        info!(
            worker = %worker_name,
            task_id = %task.id(),
            spec = %spec,
            %priority,
            "assigned task"
        );

        Ok(vec![Job::new(
            task.id(),
            spec.commit_sha().clone(),
            &module,
            self.run,
        )])
    }
}
