use fanout_core::{ProxyId, Shared, Task, TaskContainer, TaskId, TaskResult};
use serde::{Deserialize, Serialize};

/// Everything the Space service accepts, from clients and from workers.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceRequest {
    /// A worker joining the pool. `endpoint` is where its own service
    /// listens; `capacity` caps the tasks its proxy keeps in flight.
    Register { endpoint: String, capacity: usize },
    Put { task: Task },
    /// Long-poll for a final result for at most `wait_ms`.
    Take { wait_ms: u64 },
    SetShared { shared: Shared },
    /// A worker's leaf result, routed through its proxy.
    PutResult {
        proxy_id: ProxyId,
        result: TaskResult,
        origin: TaskId,
    },
    /// A worker's decomposition, routed through its proxy.
    PutGenerated {
        proxy_id: ProxyId,
        container: TaskContainer,
        origin: TaskId,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceReply {
    Ack,
    Registered { proxy_id: ProxyId },
    Result(TaskResult),
    /// No final result within the wait; ask again.
    Empty,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use fanout_core::{Fibonacci, ResultValue, SuccessorId, Workload};

    use super::*;

    #[test]
    fn put_generated_decodes_with_its_successor() {
        let task = Task::new(Workload::Fibonacci(Fibonacci::new(6)));
        let container = task
            .generate(SuccessorId::new(), &fanout_core::SharedCell::new())
            .unwrap();
        let request = SpaceRequest::PutGenerated {
            proxy_id: ProxyId::new(),
            container,
            origin: task.id,
        };

        let bytes = rmp_serde::to_vec(&request).unwrap();
        match rmp_serde::from_slice::<SpaceRequest>(&bytes).unwrap() {
            SpaceRequest::PutGenerated { container, origin, .. } => {
                assert_eq!(origin, task.id);
                assert_eq!(container.children().len(), 2);
                assert_eq!(container.successor().join_count(), 2);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn result_reply_carries_value() {
        let reply = SpaceReply::Result(TaskResult::new(
            Some(ResultValue::Fibonacci(21)),
            -1,
            SuccessorId::new(),
        ));
        let bytes = rmp_serde::to_vec(&reply).unwrap();
        assert_eq!(rmp_serde::from_slice::<SpaceReply>(&bytes).unwrap(), reply);
    }
}
