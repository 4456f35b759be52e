//! In-memory task store implementing every task and scheduler port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::scheduler::ports::{CandidateQueries, FailureSummary, RecentCommit};
use crate::task::{
    domain::{
        BenchModule, Commit, CommitSha, Datafile, DatafileId, TargetId, Task, TaskId, TaskSpec,
        TaskStatus, WorkerName,
    },
    ports::{ModuleResolver, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task store.
///
/// Holds tasks, datafiles, and the module/commit catalog behind a single
/// lock so compound operations such as
/// [`TaskRepository::record_data_upload`] are applied all-or-nothing.
pub struct InMemoryTaskRepository<C = DefaultClock>
where
    C: Clock + Send + Sync,
{
    state: Arc<RwLock<InMemoryTaskState>>,
    clock: Arc<C>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: Vec<Task>,
    task_index: HashMap<TaskId, usize>,
    datafiles: HashMap<DatafileId, Datafile>,
    modules: BTreeMap<TargetId, BenchModule>,
    commits: HashMap<CommitSha, Commit>,
}

impl InMemoryTaskState {
    fn task_mut(&mut self, id: TaskId) -> TaskRepositoryResult<&mut Task> {
        let position = *self
            .task_index
            .get(&id)
            .ok_or(TaskRepositoryError::NotFound(id))?;
        self.tasks
            .get_mut(position)
            .ok_or(TaskRepositoryError::NotFound(id))
    }

    fn worker_tasks<'a>(&'a self, worker: &'a WorkerName) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |task| task.worker() == worker)
    }

    fn has_success(&self, worker: &WorkerName, spec: &TaskSpec) -> bool {
        self.worker_tasks(worker)
            .any(|task| task.spec() == spec && task.status() == TaskStatus::CompleteSuccess)
    }

    /// Whether `worker` already finished `spec` one way or the other.
    fn has_outcome(&self, worker: &WorkerName, spec: &TaskSpec) -> bool {
        self.worker_tasks(worker).any(|task| {
            task.spec() == spec
                && (task.status() == TaskStatus::CompleteSuccess || task.status().is_failure())
        })
    }

    fn modules_by_path(&self) -> Vec<&BenchModule> {
        let mut modules: Vec<&BenchModule> = self.modules.values().collect();
        modules.sort_by(|a, b| a.path().cmp(b.path()).then(a.id().cmp(&b.id())));
        modules
    }
}

impl InMemoryTaskRepository<DefaultClock> {
    /// Creates an empty repository stamping transitions with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl Default for InMemoryTaskRepository<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for InMemoryTaskRepository<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> fmt::Debug for InMemoryTaskRepository<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTaskRepository")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<C> InMemoryTaskRepository<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty repository stamping transitions with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryTaskState::default())),
            clock,
        }
    }

    /// Adds or replaces a module in the target catalog.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the lock is poisoned.
    pub fn add_module(&self, module: BenchModule) -> TaskRepositoryResult<()> {
        let mut state = self.write_state()?;
        state.modules.insert(module.id(), module);
        Ok(())
    }

    /// Adds or replaces a commit in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the lock is poisoned.
    pub fn add_commit(&self, commit: Commit) -> TaskRepositoryResult<()> {
        let mut state = self.write_state()?;
        state.commits.insert(commit.sha.clone(), commit);
        Ok(())
    }

    fn read_state(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write_state(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl<C> TaskRepository for InMemoryTaskRepository<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn create(&self, worker: &WorkerName, spec: &TaskSpec) -> TaskRepositoryResult<Task> {
        let task = Task::new(worker.clone(), spec.clone(), &*self.clock);
        let mut state = self.write_state()?;
        let position = state.tasks.len();
        state.task_index.insert(task.id(), position);
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.read_state()?;
        let task = state
            .task_index
            .get(&id)
            .and_then(|position| state.tasks.get(*position))
            .cloned();
        Ok(task)
    }

    async fn list_worker_tasks_with_status(
        &self,
        worker: &WorkerName,
        statuses: &[TaskStatus],
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read_state()?;
        Ok(state
            .worker_tasks(worker)
            .filter(|task| statuses.contains(&task.status()))
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        id: TaskId,
        from: &[TaskStatus],
        to: TaskStatus,
    ) -> TaskRepositoryResult<Task> {
        let now = self.clock.utc();
        let mut state = self.write_state()?;
        let task = state.task_mut(id)?;
        task.transition(from, to, now)?;
        Ok(task.clone())
    }

    async fn record_data_upload(
        &self,
        id: TaskId,
        datafile: &Datafile,
    ) -> TaskRepositoryResult<Task> {
        let now = self.clock.utc();
        let mut state = self.write_state()?;

        if state.datafiles.contains_key(&datafile.id()) {
            return Err(TaskRepositoryError::DuplicateDatafile(datafile.id()));
        }

        // Bind on a copy so a rejected transition leaves the stored task intact.
        let mut updated = state.task_mut(id)?.clone();
        updated.bind_datafile(datafile.id(), now)?;

        state.datafiles.insert(datafile.id(), datafile.clone());
        *state.task_mut(id)? = updated.clone();
        Ok(updated)
    }

    async fn find_datafile(&self, id: DatafileId) -> TaskRepositoryResult<Option<Datafile>> {
        let state = self.read_state()?;
        Ok(state.datafiles.get(&id).cloned())
    }

    async fn timeout_stale_tasks(
        &self,
        before: DateTime<Utc>,
    ) -> TaskRepositoryResult<Vec<TaskId>> {
        let now = self.clock.utc();
        let mut state = self.write_state()?;
        let mut swept = Vec::new();
        for task in &mut state.tasks {
            let is_stale = TaskStatus::STALE_CANDIDATES.contains(&task.status())
                && task.last_status_update() < before;
            if is_stale {
                task.transition(
                    &TaskStatus::STALE_CANDIDATES,
                    TaskStatus::StaleTimeout,
                    now,
                )?;
                swept.push(task.id());
            }
        }
        Ok(swept)
    }
}

#[async_trait]
impl<C> ModuleResolver for InMemoryTaskRepository<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn find_module_by_id(&self, id: TargetId) -> TaskRepositoryResult<Option<BenchModule>> {
        let state = self.read_state()?;
        Ok(state.modules.get(&id).cloned())
    }
}

#[async_trait]
impl<C> CandidateQueries for InMemoryTaskRepository<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn untested_recent_commits(
        &self,
        worker: &WorkerName,
        since: DateTime<Utc>,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<RecentCommit>> {
        let state = self.read_state()?;

        let mut commits: Vec<&Commit> = state
            .commits
            .values()
            .filter(|commit| commit.committed_at >= since)
            .collect();
        commits.sort_by(|a, b| {
            b.committed_at
                .cmp(&a.committed_at)
                .then_with(|| a.sha.cmp(&b.sha))
        });

        let ordered_modules = state.modules_by_path();
        let modules = &ordered_modules;
        let candidates = commits
            .into_iter()
            .flat_map(move |commit| {
                modules.iter().map(move |module| RecentCommit {
                    spec: TaskSpec::module(module.id(), commit.sha.clone()),
                    committed_at: commit.committed_at,
                })
            })
            .filter(|candidate| !state.has_outcome(worker, &candidate.spec))
            .take(limit)
            .collect();
        Ok(candidates)
    }

    async fn failure_summaries(
        &self,
        worker: &WorkerName,
    ) -> TaskRepositoryResult<Vec<FailureSummary>> {
        let state = self.read_state()?;

        let mut by_spec: BTreeMap<&TaskSpec, FailureSummary> = BTreeMap::new();
        for task in state.worker_tasks(worker) {
            let summary = by_spec.entry(task.spec()).or_insert_with(|| FailureSummary {
                spec: task.spec().clone(),
                error_count: 0,
                last_attempt: task.last_status_update(),
            });
            if task.status().is_failure() {
                summary.error_count = summary.error_count.saturating_add(1);
            }
            summary.last_attempt = summary.last_attempt.max(task.last_status_update());
        }

        Ok(by_spec
            .into_values()
            .filter(|summary| summary.error_count > 0)
            .filter(|summary| !state.has_success(worker, &summary.spec))
            .collect())
    }
}
