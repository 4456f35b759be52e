//! Diesel schema for task assignment persistence.

diesel::table! {
    /// One row per task attempt.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Worker the task is bound to.
        #[max_length = 100]
        worker -> Varchar,
        /// Target kind of the spec.
        #[max_length = 20]
        kind -> Varchar,
        /// Target identifier of the spec.
        target_id -> Uuid,
        /// Commit hash of the spec.
        #[max_length = 40]
        commit_sha -> Varchar,
        /// Task lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Timestamp of the latest status transition.
        last_status_update -> Timestamptz,
        /// Bound result datafile.
        datafile_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    /// Uploaded benchmark output.
    datafiles (id) {
        /// Datafile identifier.
        id -> Uuid,
        /// Hex-encoded SHA-256 digest of `contents`.
        #[max_length = 64]
        sha256 -> Varchar,
        /// Raw output.
        contents -> Bytea,
        /// Upload timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Benchmark target catalog.
    modules (id) {
        /// Module identifier.
        id -> Uuid,
        /// Module import path.
        path -> Text,
        /// Module version.
        version -> Text,
    }
}

diesel::table! {
    /// Commit catalog joined by the recent-commits strategy.
    commits (sha) {
        /// Commit hash.
        #[max_length = 40]
        sha -> Varchar,
        /// Commit timestamp.
        committed_at -> Timestamptz,
    }
}
