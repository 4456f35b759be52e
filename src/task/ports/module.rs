//! Target resolution port used to expand a spec into a runnable job.

use super::TaskRepositoryResult;
use crate::task::domain::{BenchModule, TargetId};
use async_trait::async_trait;

/// Lookup contract for benchmark targets.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Finds a module by identifier.
    ///
    /// Returns `None` when the module does not exist.
    async fn find_module_by_id(&self, id: TargetId) -> TaskRepositoryResult<Option<BenchModule>>;
}
