use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::successor::SuccessorTask;
use crate::task::Task;

/// A successor together with the children it joins. Travels from a worker to
/// the Space as one unit so the join table and ready queue stay consistent.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskContainer {
    successor: SuccessorTask,
    children: Vec<Task>,
}

impl TaskContainer {
    /// Checks that the successor joins exactly these children.
    pub fn new(successor: SuccessorTask, children: Vec<Task>) -> Result<Self, CoreError> {
        if successor.join_count() != children.len() {
            return Err(CoreError::InvalidContainer(format!(
                "successor joins {} results but {} children were generated",
                successor.join_count(),
                children.len()
            )));
        }
        if let Some(stray) = children
            .iter()
            .find(|child| child.successor_id != successor.join_id())
        {
            return Err(CoreError::InvalidContainer(format!(
                "child {} is addressed to {} instead of {}",
                stray.id,
                stray.successor_id,
                successor.join_id()
            )));
        }
        Ok(Self::paired(successor, children))
    }

    pub(crate) fn paired(successor: SuccessorTask, children: Vec<Task>) -> Self {
        Self {
            successor,
            children,
        }
    }

    pub fn successor(&self) -> &SuccessorTask {
        &self.successor
    }

    pub fn children(&self) -> &[Task] {
        &self.children
    }

    /// True when generation produced no children.
    pub fn is_pruned(&self) -> bool {
        self.children.is_empty()
    }

    pub fn into_parts(self) -> (SuccessorTask, Vec<Task>) {
        (self.successor, self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::successor::Composer;
    use crate::types::SuccessorId;
    use crate::workload::{Fibonacci, Workload};

    #[test]
    fn rejects_count_mismatch() {
        let join = SuccessorId::new();
        let successor = SuccessorTask::new(join, SuccessorId::new(), 0, Composer::FibonacciSum, 2);
        let child = Task::child(Workload::Fibonacci(Fibonacci::new(1)), join, 1);
        assert!(matches!(
            TaskContainer::new(successor, vec![child]),
            Err(CoreError::InvalidContainer(_))
        ));
    }

    #[test]
    fn rejects_misaddressed_child() {
        let join = SuccessorId::new();
        let successor = SuccessorTask::new(join, SuccessorId::new(), 0, Composer::FibonacciSum, 1);
        let child = Task::child(Workload::Fibonacci(Fibonacci::new(1)), SuccessorId::new(), 1);
        assert!(TaskContainer::new(successor, vec![child]).is_err());
    }

    #[test]
    fn survives_messagepack() {
        let task = Task::new(Workload::Fibonacci(Fibonacci::new(3)));
        let container = task
            .generate(SuccessorId::new(), &crate::shared::SharedCell::new())
            .unwrap();
        let bytes = rmp_serde::to_vec(&container).unwrap();
        let decoded: TaskContainer = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded.children(), container.children());
        assert_eq!(decoded.successor().join_count(), 2);
    }
}
