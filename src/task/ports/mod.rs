//! Port contracts for task persistence and target resolution.
//!
//! Ports define infrastructure-agnostic interfaces used by task services,
//! the coordinator, and the stale reaper.

pub mod module;
pub mod repository;

pub use module::ModuleResolver;
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
