use fanout_core::{Shared, SuccessorId, Task, TaskContainer, TaskResult};
use serde::{Deserialize, Serialize};

/// Calls from the Space to one worker's service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputerRequest {
    /// Queue for execution; the outcome returns through the worker's proxy.
    Enqueue { task: Task },
    Execute { task: Task },
    Generate { task: Task, successor_id: SuccessorId },
    SetShared { shared: Shared, from_space: bool },
    GetShared,
    Shutdown,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputerReply {
    Ack,
    Result(TaskResult),
    Container(TaskContainer),
    Shared(Option<Shared>),
    Error { message: String },
}
