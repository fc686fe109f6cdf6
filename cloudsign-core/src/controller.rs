//! Query side of the orchestration controller.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BackendServer, GroupInfo};

/// Read-only view of the controller that tracks server lifecycles.
///
/// Implementations own their timeout and retry behaviour. A failed call is
/// reported as an error and the caller keeps whatever it had cached.
#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// All servers currently known for `group`.
    async fn servers_by_group(&self, group: &str) -> Result<Vec<BackendServer>>;

    /// Fails with [`SignError::GroupNotFound`](crate::SignError::GroupNotFound)
    /// when the controller does not know the group.
    async fn group_by_name(&self, name: &str) -> Result<GroupInfo>;

    async fn all_groups(&self) -> Result<Vec<GroupInfo>>;
}
