//! `PostgreSQL` repository implementation for task storage.
//!
//! Every status change locks the task row with `SELECT ... FOR UPDATE`,
//! applies the domain transition, and writes back inside one transaction,
//! so the compare-and-set and compound upload semantics of the port hold
//! across processes.

use super::{
    models::{
        DatafileRow, FailureSummaryRow, ModuleRow, NewCommitRow, NewModuleRow, RecentCommitRow,
        TaskRow,
    },
    schema::{commits, datafiles, modules, tasks},
};
use crate::scheduler::ports::{CandidateQueries, FailureSummary, RecentCommit};
use crate::task::{
    domain::{
        BenchModule, Commit, CommitSha, Datafile, DatafileId, PersistedTaskData, TargetId, Task,
        TaskId, TaskKind, TaskSpec, TaskStatus, WorkerName,
    },
    ports::{ModuleResolver, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// Idempotent DDL creating every table the adapter reads or writes.
pub const SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-01-000000_create_benchplane_tables/up.sql");

/// `PostgreSQL`-backed task store.
pub struct PostgresTaskRepository<C = DefaultClock>
where
    C: Clock + Send + Sync,
{
    pool: TaskPgPool,
    clock: Arc<C>,
}

impl<C> Clone for PostgresTaskRepository<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> PostgresTaskRepository<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool, clock: Arc<C>) -> Self {
        Self { pool, clock }
    }

    /// Current time at the microsecond precision of `timestamptz`.
    fn storage_now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(6)
    }

    /// Creates any missing tables and indexes.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the DDL fails.
    pub async fn ensure_schema(&self) -> TaskRepositoryResult<()> {
        self.run_blocking(|connection| {
            connection.batch_execute(SCHEMA_SQL)?;
            Ok(())
        })
        .await
    }

    /// Adds or replaces a module in the target catalog.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the write fails.
    pub async fn add_module(&self, module: &BenchModule) -> TaskRepositoryResult<()> {
        let row = NewModuleRow {
            id: module.id().into_inner(),
            path: module.path().to_owned(),
            version: module.version().to_owned(),
        };
        self.run_blocking(move |connection| {
            diesel::insert_into(modules::table)
                .values(&row)
                .on_conflict(modules::id)
                .do_update()
                .set(&row)
                .execute(connection)?;
            Ok(())
        })
        .await
    }

    /// Adds a commit to the catalog, keeping an existing timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the write fails.
    pub async fn add_commit(&self, commit: &Commit) -> TaskRepositoryResult<()> {
        let row = NewCommitRow {
            sha: commit.sha.as_str().to_owned(),
            committed_at: commit.committed_at,
        };
        self.run_blocking(move |connection| {
            diesel::insert_into(commits::table)
                .values(&row)
                .on_conflict_do_nothing()
                .execute(connection)?;
            Ok(())
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl<C> TaskRepository for PostgresTaskRepository<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn create(&self, worker: &WorkerName, spec: &TaskSpec) -> TaskRepositoryResult<Task> {
        let task = Task::new(worker.clone(), spec.clone(), &*self.clock);
        let row = to_row(&task);

        // Read back the stored row so the timestamp carries column precision.
        self.run_blocking(move |connection| {
            let stored = diesel::insert_into(tasks::table)
                .values(&row)
                .returning(TaskRow::as_returning())
                .get_result::<TaskRow>(connection)?;
            row_to_task(stored)
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_worker_tasks_with_status(
        &self,
        worker: &WorkerName,
        statuses: &[TaskStatus],
    ) -> TaskRepositoryResult<Vec<Task>> {
        let worker_name = worker.as_str().to_owned();
        let status_names = status_strings(statuses);

        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::worker.eq(&worker_name))
                .filter(tasks::status.eq_any(&status_names))
                .order(tasks::last_status_update.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn transition_status(
        &self,
        id: TaskId,
        from: &[TaskStatus],
        to: TaskStatus,
    ) -> TaskRepositoryResult<Task> {
        let expected = from.to_vec();
        let now = self.storage_now();

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let mut task = lock_task(tx, id)?;
                task.transition(&expected, to, now)?;
                write_task_status(tx, &task)?;
                Ok(task)
            })
        })
        .await
    }

    async fn record_data_upload(
        &self,
        id: TaskId,
        datafile: &Datafile,
    ) -> TaskRepositoryResult<Task> {
        let datafile_id = datafile.id();
        let datafile_row = DatafileRow {
            id: datafile_id.into_inner(),
            sha256: datafile.sha256().to_owned(),
            contents: datafile.contents().to_vec(),
            created_at: datafile.created_at(),
        };
        let now = self.storage_now();

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let mut task = lock_task(tx, id)?;
                task.bind_datafile(datafile_id, now)?;

                diesel::insert_into(datafiles::table)
                    .values(&datafile_row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            TaskRepositoryError::DuplicateDatafile(datafile_id)
                        }
                        _ => TaskRepositoryError::persistence(err),
                    })?;

                write_task_status(tx, &task)?;
                Ok(task)
            })
        })
        .await
    }

    async fn find_datafile(&self, id: DatafileId) -> TaskRepositoryResult<Option<Datafile>> {
        self.run_blocking(move |connection| {
            let row = datafiles::table
                .find(id.into_inner())
                .select(DatafileRow::as_select())
                .first::<DatafileRow>(connection)
                .optional()?;
            Ok(row.map(|found| {
                Datafile::from_persisted(
                    DatafileId::from_uuid(found.id),
                    found.sha256,
                    found.contents,
                    found.created_at,
                )
            }))
        })
        .await
    }

    async fn timeout_stale_tasks(
        &self,
        before: DateTime<Utc>,
    ) -> TaskRepositoryResult<Vec<TaskId>> {
        let now = self.storage_now();
        let candidates = status_strings(&TaskStatus::STALE_CANDIDATES);

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let rows = tasks::table
                    .filter(tasks::status.eq_any(&candidates))
                    .filter(tasks::last_status_update.lt(before))
                    .for_update()
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(tx)?;

                let mut swept = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut task = row_to_task(row)?;
                    task.transition(
                        &TaskStatus::STALE_CANDIDATES,
                        TaskStatus::StaleTimeout,
                        now,
                    )?;
                    write_task_status(tx, &task)?;
                    swept.push(task.id());
                }
                Ok(swept)
            })
        })
        .await
    }
}

#[async_trait]
impl<C> ModuleResolver for PostgresTaskRepository<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn find_module_by_id(&self, id: TargetId) -> TaskRepositoryResult<Option<BenchModule>> {
        self.run_blocking(move |connection| {
            let row = modules::table
                .find(id.into_inner())
                .select(ModuleRow::as_select())
                .first::<ModuleRow>(connection)
                .optional()?;
            row.map(|found| {
                BenchModule::new(TargetId::from_uuid(found.id), found.path, found.version)
                    .map_err(TaskRepositoryError::persistence)
            })
            .transpose()
        })
        .await
    }
}

#[async_trait]
impl<C> CandidateQueries for PostgresTaskRepository<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn untested_recent_commits(
        &self,
        worker: &WorkerName,
        since: DateTime<Utc>,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<RecentCommit>> {
        let worker_name = worker.as_str().to_owned();
        let row_limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT c.sha AS commit_sha, c.committed_at, m.id AS module_id ",
                "FROM commits c CROSS JOIN modules m ",
                "WHERE c.committed_at >= $2 ",
                "AND NOT EXISTS (",
                "SELECT 1 FROM tasks t WHERE t.worker = $1 AND t.kind = 'module' ",
                "AND t.target_id = m.id AND t.commit_sha = c.sha ",
                "AND t.status IN ('complete_success', 'complete_error', 'halted', ",
                "'stale_timeout')) ",
                "ORDER BY c.committed_at DESC, c.sha, m.path, m.id ",
                "LIMIT $3",
            ))
            .bind::<diesel::sql_types::Text, _>(&worker_name)
            .bind::<diesel::sql_types::Timestamptz, _>(since)
            .bind::<diesel::sql_types::BigInt, _>(row_limit)
            .load::<RecentCommitRow>(connection)?;

            rows.into_iter()
                .map(|row| {
                    let sha = CommitSha::new(row.commit_sha)
                        .map_err(TaskRepositoryError::persistence)?;
                    Ok(RecentCommit {
                        spec: TaskSpec::module(TargetId::from_uuid(row.module_id), sha),
                        committed_at: row.committed_at,
                    })
                })
                .collect()
        })
        .await
    }

    async fn failure_summaries(
        &self,
        worker: &WorkerName,
    ) -> TaskRepositoryResult<Vec<FailureSummary>> {
        let worker_name = worker.as_str().to_owned();

        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT t.kind, t.target_id, t.commit_sha, ",
                "COUNT(*) FILTER (WHERE t.status IN ",
                "('complete_error', 'halted', 'stale_timeout')) AS error_count, ",
                "MAX(t.last_status_update) AS last_attempt ",
                "FROM tasks t WHERE t.worker = $1 ",
                "GROUP BY t.kind, t.target_id, t.commit_sha ",
                "HAVING COUNT(*) FILTER (WHERE t.status IN ",
                "('complete_error', 'halted', 'stale_timeout')) > 0 ",
                "AND COUNT(*) FILTER (WHERE t.status = 'complete_success') = 0 ",
                "ORDER BY t.kind, t.target_id, t.commit_sha",
            ))
            .bind::<diesel::sql_types::Text, _>(&worker_name)
            .load::<FailureSummaryRow>(connection)?;

            rows.into_iter().map(row_to_failure_summary).collect()
        })
        .await
    }
}

fn status_strings(statuses: &[TaskStatus]) -> Vec<String> {
    statuses
        .iter()
        .map(|status| status.as_str().to_owned())
        .collect()
}

fn lock_task(connection: &mut PgConnection, id: TaskId) -> TaskRepositoryResult<Task> {
    let row = tasks::table
        .find(id.into_inner())
        .for_update()
        .select(TaskRow::as_select())
        .first::<TaskRow>(connection)
        .optional()?
        .ok_or(TaskRepositoryError::NotFound(id))?;
    row_to_task(row)
}

fn write_task_status(connection: &mut PgConnection, task: &Task) -> TaskRepositoryResult<()> {
    diesel::update(tasks::table.find(task.id().into_inner()))
        .set((
            tasks::status.eq(task.status().as_str()),
            tasks::last_status_update.eq(task.last_status_update()),
            tasks::datafile_id.eq(task.datafile_id().map(DatafileId::into_inner)),
        ))
        .execute(connection)?;
    Ok(())
}

fn to_row(task: &Task) -> TaskRow {
    TaskRow {
        id: task.id().into_inner(),
        worker: task.worker().as_str().to_owned(),
        kind: task.spec().kind().as_str().to_owned(),
        target_id: task.spec().target_id().into_inner(),
        commit_sha: task.spec().commit_sha().as_str().to_owned(),
        status: task.status().as_str().to_owned(),
        last_status_update: task.last_status_update(),
        datafile_id: task.datafile_id().map(DatafileId::into_inner),
    }
}

fn row_to_spec(
    kind: &str,
    target_id: uuid::Uuid,
    commit_sha: String,
) -> TaskRepositoryResult<TaskSpec> {
    let parsed_kind = TaskKind::try_from(kind).map_err(TaskRepositoryError::persistence)?;
    let parsed_sha = CommitSha::new(commit_sha).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskSpec::from_parts(
        parsed_kind,
        TargetId::from_uuid(target_id),
        parsed_sha,
    ))
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        worker,
        kind,
        target_id,
        commit_sha,
        status,
        last_status_update,
        datafile_id,
    } = row;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        worker: WorkerName::new(worker).map_err(TaskRepositoryError::persistence)?,
        spec: row_to_spec(&kind, target_id, commit_sha)?,
        status: TaskStatus::try_from(status.as_str()).map_err(TaskRepositoryError::persistence)?,
        last_status_update,
        datafile_id: datafile_id.map(DatafileId::from_uuid),
    };
    Ok(Task::from_persisted(data))
}

fn row_to_failure_summary(row: FailureSummaryRow) -> TaskRepositoryResult<FailureSummary> {
    Ok(FailureSummary {
        spec: row_to_spec(&row.kind, row.target_id, row.commit_sha)?,
        error_count: u32::try_from(row.error_count).unwrap_or(u32::MAX),
        last_attempt: row.last_attempt,
    })
}
