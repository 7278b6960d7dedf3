use async_trait::async_trait;

use crate::container::TaskContainer;
use crate::error::CoreError;
use crate::result::TaskResult;
use crate::shared::{Shared, SharedCell};
use crate::task::Task;
use crate::types::{SuccessorId, TaskId};

/// Read and improve the shared bound from inside a running task.
pub trait SharedAccess: Send + Sync {
    /// Current bound as seen by this holder, possibly stale.
    fn shared(&self) -> Option<Shared>;

    /// Offer an improved bound. Returns true if it was adopted.
    fn propose(&self, candidate: Shared) -> bool;
}

impl SharedAccess for SharedCell {
    fn shared(&self) -> Option<Shared> {
        self.get()
    }

    fn propose(&self, candidate: Shared) -> bool {
        self.offer(candidate)
    }
}

/// A worker as seen from the coordinator.
///
/// `enqueue` only hands the task over; its outcome comes back later through
/// the worker's [`SpaceLink`]. The synchronous operations compute in place.
#[async_trait]
pub trait Computer: Send + Sync {
    async fn enqueue(&self, task: Task) -> Result<(), CoreError>;

    async fn execute(&self, task: Task) -> Result<TaskResult, CoreError>;

    async fn generate(
        &self,
        task: Task,
        successor_id: SuccessorId,
    ) -> Result<TaskContainer, CoreError>;

    /// `from_space` is true when the value is a broadcast from the
    /// coordinator, in which case it must not be echoed back.
    async fn set_shared(&self, shared: Shared, from_space: bool) -> Result<(), CoreError>;

    async fn get_shared(&self) -> Result<Option<Shared>, CoreError>;

    async fn shutdown(&self) -> Result<(), CoreError>;
}

/// The path from a worker back to its coordinator-side proxy.
#[async_trait]
pub trait SpaceLink: Send + Sync {
    /// Report a decomposition of the task `origin`.
    async fn put_generated_tasks(
        &self,
        container: TaskContainer,
        origin: TaskId,
    ) -> Result<(), CoreError>;

    /// Report the leaf result of the task `origin`.
    async fn put_results(&self, result: TaskResult, origin: TaskId) -> Result<(), CoreError>;

    async fn set_shared(&self, shared: Shared) -> Result<(), CoreError>;
}

/// Client-facing surface of a Space, local or remote.
#[async_trait]
pub trait ComputeSpace: Send + Sync {
    async fn put(&self, task: Task) -> Result<(), CoreError>;

    /// Wait for the next final result.
    async fn take(&self) -> Result<TaskResult, CoreError>;

    /// Seed the shared value, submit `task` and wait for its final result.
    async fn compute(&self, task: Task, seed: Option<Shared>) -> Result<TaskResult, CoreError>;

    async fn shutdown(&self) -> Result<(), CoreError>;
}
