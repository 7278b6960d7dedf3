use serde::{Deserialize, Serialize};

use crate::api::SharedAccess;
use crate::container::TaskContainer;
use crate::error::CoreError;
use crate::result::TaskResult;
use crate::successor::SuccessorTask;
use crate::types::{SuccessorId, TaskId, TaskKind};
use crate::workload::Workload;

/// A unit of work travelling between the client, the Space and the workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Successor that consumes this task's result.
    pub successor_id: SuccessorId,
    pub level: i32,
    pub kind: TaskKind,
    pub workload: Workload,
}

impl Task {
    /// A root task: level 0, addressed to a successor nobody waits on, so its
    /// result ends up at the final level.
    pub fn new(workload: Workload) -> Self {
        Self::child(workload, SuccessorId::new(), 0)
    }

    pub fn child(workload: Workload, successor_id: SuccessorId, level: i32) -> Self {
        Self {
            id: TaskId::new(),
            successor_id,
            level,
            kind: TaskKind::Child,
            workload,
        }
    }

    pub fn is_decomposable(&self) -> bool {
        self.workload.is_decomposable(self.level)
    }

    /// Leaf computation. The result goes one level up, to this task's
    /// successor.
    pub fn execute(&self, shared: &dyn SharedAccess) -> Result<TaskResult, CoreError> {
        if self.is_decomposable() {
            return Err(CoreError::Decomposable);
        }
        let value = self.workload.execute(shared);
        Ok(TaskResult::new(value, self.level - 1, self.successor_id))
    }

    /// Children one level down, each addressed to `successor_id`. A task that
    /// is not decomposable has none.
    pub fn generate_tasks(
        &self,
        successor_id: SuccessorId,
        shared: &dyn SharedAccess,
    ) -> Vec<Task> {
        if !self.is_decomposable() {
            return Vec::new();
        }
        self.workload
            .split(shared)
            .into_iter()
            .map(|workload| Task::child(workload, successor_id, self.level + 1))
            .collect()
    }

    /// Successor joining `join_count` children that carry `join_id`. It sits
    /// at this task's level and delivers to this task's own successor.
    pub fn generate_successor_task(
        &self,
        join_id: SuccessorId,
        join_count: usize,
    ) -> SuccessorTask {
        SuccessorTask::new(
            join_id,
            self.successor_id,
            self.level,
            self.workload.composer(),
            join_count,
        )
    }

    /// Children plus their successor, sized to the children actually produced.
    pub fn generate(
        &self,
        successor_id: SuccessorId,
        shared: &dyn SharedAccess,
    ) -> Result<TaskContainer, CoreError> {
        if !self.is_decomposable() {
            return Err(CoreError::NotDecomposable);
        }
        let children = self.generate_tasks(successor_id, shared);
        let successor = self.generate_successor_task(successor_id, children.len());
        Ok(TaskContainer::paired(successor, children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultValue;
    use crate::shared::{Shared, SharedCell};
    use crate::types::FINAL_LEVEL;
    use crate::workload::{Fibonacci, TspGraph, TspNode};

    #[test]
    fn root_leaf_executes_to_final_level() {
        let task = Task::new(Workload::Fibonacci(Fibonacci::new(1)));
        let result = task.execute(&SharedCell::new()).unwrap();
        assert_eq!(result.level(), FINAL_LEVEL);
        assert_eq!(result.successor_id(), task.successor_id);
        assert_eq!(result.value(), Some(&ResultValue::Fibonacci(1)));
    }

    #[test]
    fn decomposable_task_refuses_execute() {
        let task = Task::new(Workload::Fibonacci(Fibonacci::new(4)));
        assert_eq!(task.execute(&SharedCell::new()), Err(CoreError::Decomposable));
    }

    #[test]
    fn leaf_task_refuses_generate() {
        for n in [0, 1] {
            let task = Task::new(Workload::Fibonacci(Fibonacci::new(n)));
            let shared = SharedCell::new();
            assert!(task.generate_tasks(SuccessorId::new(), &shared).is_empty());
            assert_eq!(
                task.generate(SuccessorId::new(), &shared).unwrap_err(),
                CoreError::NotDecomposable
            );
        }
    }

    #[test]
    fn generate_pairs_children_with_successor() {
        let task = Task::new(Workload::Fibonacci(Fibonacci::new(4)));
        let join = SuccessorId::new();
        let container = task.generate(join, &SharedCell::new()).unwrap();

        assert_eq!(container.successor().join_count(), container.children().len());
        assert_eq!(container.successor().join_id(), join);
        assert_eq!(container.successor().destination(), task.successor_id);
        assert_eq!(container.successor().level(), 0);
        for child in container.children() {
            assert_eq!(child.successor_id, join);
            assert_eq!(child.level, 1);
        }
    }

    #[test]
    fn fully_pruned_generation_is_immediately_composable() {
        let graph = TspGraph::from_cities(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let task = Task::new(Workload::Tsp(TspNode::root(graph)));
        let cell = SharedCell::with_value(Shared::new(0.5));

        let container = task.generate(SuccessorId::new(), &cell).unwrap();
        assert!(container.children().is_empty());
        assert!(container.successor().is_ready());
        let result = container.successor().compose().unwrap();
        assert_eq!(result.value(), None);
        assert_eq!(result.level(), FINAL_LEVEL);
    }
}
