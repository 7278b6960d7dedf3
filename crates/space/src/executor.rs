use std::sync::Arc;

use fanout_core::{SuccessorTask, TaskResult};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Composes ready successors off the intake path and feeds their results
/// back into intake, one level up.
#[derive(Debug, Clone)]
pub struct SuccessorExecutor {
    ready_tx: mpsc::UnboundedSender<Arc<SuccessorTask>>,
}

impl SuccessorExecutor {
    /// Start the executor task. It ends once every handle is dropped.
    pub fn spawn(intake: mpsc::UnboundedSender<TaskResult>) -> Self {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run(ready_rx, intake));
        Self { ready_tx }
    }

    pub fn submit(&self, successor: Arc<SuccessorTask>) {
        if self.ready_tx.send(successor).is_err() {
            warn!("successor executor stopped, dropping ready successor");
        }
    }

    async fn run(
        mut ready_rx: mpsc::UnboundedReceiver<Arc<SuccessorTask>>,
        intake: mpsc::UnboundedSender<TaskResult>,
    ) {
        while let Some(successor) = ready_rx.recv().await {
            match successor.compose() {
                Ok(result) => {
                    debug!(
                        successor_id = %successor.join_id(),
                        destination = %result.successor_id(),
                        level = result.level(),
                        "composed successor"
                    );
                    if intake.send(result).is_err() {
                        debug!("result intake closed, executor exiting");
                        break;
                    }
                }
                Err(error) => warn!(successor_id = %successor.join_id(), %error, "compose failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use fanout_core::{Composer, ResultValue, SuccessorId};

    use super::*;

    #[tokio::test]
    async fn composed_result_returns_to_intake() {
        let (intake_tx, mut intake_rx) = mpsc::unbounded_channel();
        let executor = SuccessorExecutor::spawn(intake_tx);

        let join = SuccessorId::new();
        let parent = SuccessorId::new();
        let successor = SuccessorTask::new(join, parent, 2, Composer::FibonacciSum, 1);
        successor
            .put_argument(TaskResult::new(Some(ResultValue::Fibonacci(13)), 2, join))
            .unwrap();
        executor.submit(Arc::new(successor));

        let result = intake_rx.recv().await.unwrap();
        assert_eq!(result.level(), 1);
        assert_eq!(result.successor_id(), parent);
        assert_eq!(result.value(), Some(&ResultValue::Fibonacci(13)));
    }
}
