use std::time::Duration;

use thiserror::Error;

use crate::types::SuccessorId;

/// Errors raised by the task model and by the component seams.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote peer reported: {0}")]
    Remote(String),

    #[error("successor {0} received more results than it was created to join")]
    JoinOverflow(SuccessorId),

    #[error("successor {successor} is not ready: {remaining} results outstanding")]
    NotReady { successor: SuccessorId, remaining: usize },

    #[error("successor {0} was already composed")]
    AlreadyComposed(SuccessorId),

    #[error("task container is inconsistent: {0}")]
    InvalidContainer(String),

    #[error("task is decomposable and cannot be executed directly")]
    Decomposable,

    #[error("task is not decomposable and cannot be split")]
    NotDecomposable,

    #[error("component has shut down")]
    Shutdown,
}
