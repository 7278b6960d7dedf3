use fanout_core::{Fibonacci, ResultValue, Task, TaskResult, Workload};

use crate::error::ClientError;
use crate::job::Job;

pub struct FibonacciJob {
    n: u32,
}

impl FibonacciJob {
    pub fn new(n: u32) -> Self {
        Self { n }
    }
}

impl Job for FibonacciJob {
    type Output = u64;

    fn name(&self) -> &'static str {
        "fibonacci"
    }

    fn root_task(&self) -> Task {
        Task::new(Workload::Fibonacci(Fibonacci::new(self.n)))
    }

    fn collect(&self, result: TaskResult) -> Result<u64, ClientError> {
        match result.into_value() {
            Some(ResultValue::Fibonacci(value)) => Ok(value),
            other => Err(ClientError::UnexpectedResult {
                job: self.name(),
                detail: format!("{other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use fanout_core::{SuccessorId, FINAL_LEVEL};

    use super::*;

    #[test]
    fn root_task_is_a_level_zero_fibonacci() {
        let task = FibonacciJob::new(10).root_task();
        assert_eq!(task.workload, Workload::Fibonacci(Fibonacci::new(10)));
        assert_eq!(task.level, 0);
    }

    #[test]
    fn collects_the_sum() {
        let job = FibonacciJob::new(10);
        let value = Some(ResultValue::Fibonacci(55));
        let result = TaskResult::new(value, FINAL_LEVEL, SuccessorId::new());
        assert_eq!(job.collect(result).unwrap(), 55);
    }

    #[test]
    fn placeholder_is_an_error() {
        let job = FibonacciJob::new(10);
        let result = TaskResult::empty(FINAL_LEVEL, SuccessorId::new());
        assert!(matches!(job.collect(result), Err(ClientError::UnexpectedResult { .. })));
    }
}
