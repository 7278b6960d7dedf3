use async_trait::async_trait;
use fanout_core::{ComputeSpace, Shared, Task, TaskResult};
use tracing::info;

use crate::error::ClientError;

/// A problem submitted to a Space as one root task.
///
/// The job builds the root task and an optional seed for the shared bound,
/// then turns the final result into its own output type.
#[async_trait]
pub trait Job: Send + Sync {
    type Output: Send;

    fn name(&self) -> &'static str;

    fn root_task(&self) -> Task;

    fn seed(&self) -> Option<Shared> {
        None
    }

    fn collect(&self, result: TaskResult) -> Result<Self::Output, ClientError>;

    async fn run(&self, space: &dyn ComputeSpace) -> Result<Self::Output, ClientError> {
        let task = self.root_task();
        info!(job = self.name(), task_id = %task.id, "submitting job");
        let result = space.compute(task, self.seed()).await?;
        self.collect(result)
    }
}
