use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Level number carried by a result that is destined for the client.
pub const FINAL_LEVEL: i32 = -1;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Globally unique identifier of a task.
    TaskId
);

uuid_id!(
    /// Identifier of a successor. Child tasks carry it to name the
    /// successor that consumes their results.
    SuccessorId
);

uuid_id!(
    /// Identifier of a coordinator-side worker proxy.
    ProxyId
);

/// Whether a task is ordinary work or an aggregator joining child results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Child,
    Successor,
}
