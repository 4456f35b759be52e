//! In-memory adapter implementations for tests and single-process runs.

mod task;

pub use task::InMemoryTaskRepository;
