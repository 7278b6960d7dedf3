use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use fanout_core::Task;
use tokio::sync::Notify;

/// Unbounded ready queue. Takes pop the most recently pushed task, so freshly
/// generated children run before older siblings (depth-first bias).
#[derive(Debug, Default)]
pub struct ReadyQueue {
    tasks: Mutex<VecDeque<Task>>,
    available: Notify,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: Task) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
        self.available.notify_one();
    }

    pub fn try_take(&self) -> Option<Task> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_back()
    }

    /// Wait for a task. Cancel safe: a task is only removed in the same poll
    /// that returns it.
    pub async fn take(&self) -> Task {
        loop {
            let notified = self.available.notified();
            if let Some(task) = self.try_take() {
                return task;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
