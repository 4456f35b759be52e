//! Application services for task lifecycle orchestration.

mod lifecycle;
mod reaper;

pub use lifecycle::{TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService};
pub use reaper::StaleTaskReaper;
