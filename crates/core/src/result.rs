use serde::{Deserialize, Serialize};

use crate::types::{SuccessorId, FINAL_LEVEL};
use crate::workload::mandelbrot::MandelbrotTiles;
use crate::workload::tsp::TspTour;

/// Payload of a result. Opaque to the scheduling substrate; only the
/// workload's own composer looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultValue {
    Fibonacci(u64),
    Mandelbrot(MandelbrotTiles),
    Tsp(TspTour),
}

/// Outcome of a task, addressed to the successor that joins it.
///
/// `value == None` is the placeholder for a branch that produced nothing
/// (pruned, or no tour under the bound). Successors fold it like any other
/// argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    value: Option<ResultValue>,
    level: i32,
    successor_id: SuccessorId,
}

impl TaskResult {
    pub fn new(value: Option<ResultValue>, level: i32, successor_id: SuccessorId) -> Self {
        Self {
            value,
            level,
            successor_id,
        }
    }

    /// Placeholder result for a branch with no contribution.
    pub fn empty(level: i32, successor_id: SuccessorId) -> Self {
        Self::new(None, level, successor_id)
    }

    pub fn value(&self) -> Option<&ResultValue> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<ResultValue> {
        self.value
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn successor_id(&self) -> SuccessorId {
        self.successor_id
    }

    /// True when the result has no further parent and belongs to the client.
    pub fn is_final(&self) -> bool {
        self.level == FINAL_LEVEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_level_marks_client_result() {
        let id = SuccessorId::new();
        assert!(TaskResult::new(Some(ResultValue::Fibonacci(5)), FINAL_LEVEL, id).is_final());
        assert!(!TaskResult::empty(0, id).is_final());
    }

    #[test]
    fn survives_messagepack() {
        let result = TaskResult::new(Some(ResultValue::Fibonacci(8)), 2, SuccessorId::new());
        let bytes = rmp_serde::to_vec(&result).unwrap();
        let decoded: TaskResult = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, result);
    }
}
