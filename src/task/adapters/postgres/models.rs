//! Diesel row models for task persistence.

use super::schema::{commits, datafiles, modules, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result and insert row for task records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Worker name.
    pub worker: String,
    /// Spec target kind.
    pub kind: String,
    /// Spec target identifier.
    pub target_id: uuid::Uuid,
    /// Spec commit hash.
    pub commit_sha: String,
    /// Lifecycle status.
    pub status: String,
    /// Latest transition timestamp.
    pub last_status_update: DateTime<Utc>,
    /// Bound datafile identifier.
    pub datafile_id: Option<uuid::Uuid>,
}

/// Query result and insert row for datafile records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = datafiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DatafileRow {
    /// Datafile identifier.
    pub id: uuid::Uuid,
    /// Hex-encoded SHA-256 digest.
    pub sha256: String,
    /// Raw output.
    pub contents: Vec<u8>,
    /// Upload timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query result row for module records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = modules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ModuleRow {
    /// Module identifier.
    pub id: uuid::Uuid,
    /// Module import path.
    pub path: String,
    /// Module version.
    pub version: String,
}

/// Raw SQL result row for recent-commit candidates.
#[derive(Debug, Clone, QueryableByName)]
pub struct RecentCommitRow {
    /// Commit hash.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub commit_sha: String,
    /// Commit timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub committed_at: DateTime<Utc>,
    /// Module identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub module_id: uuid::Uuid,
}

/// Raw SQL result row for per-spec failure summaries.
#[derive(Debug, Clone, QueryableByName)]
pub struct FailureSummaryRow {
    /// Spec target kind.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub kind: String,
    /// Spec target identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub target_id: uuid::Uuid,
    /// Spec commit hash.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub commit_sha: String,
    /// Number of failed attempts.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub error_count: i64,
    /// Latest attempt timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub last_attempt: DateTime<Utc>,
}

/// Insert row for catalog modules.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = modules)]
pub struct NewModuleRow {
    /// Module identifier.
    pub id: uuid::Uuid,
    /// Module import path.
    pub path: String,
    /// Module version.
    pub version: String,
}

/// Insert row for catalog commits.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = commits)]
pub struct NewCommitRow {
    /// Commit hash.
    pub sha: String,
    /// Commit timestamp.
    pub committed_at: DateTime<Utc>,
}
