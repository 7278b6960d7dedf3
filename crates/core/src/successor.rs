//! Successor tasks and their join protocol.
//!
//! A successor is created alongside the children it joins. Each child result
//! is delivered through [`SuccessorTask::put_argument`]; once the last one
//! arrives the successor is ready and can be composed, exactly once, into a
//! result one level up.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::result::{ResultValue, TaskResult};
use crate::types::{SuccessorId, TaskId};
use crate::workload::{fibonacci, mandelbrot, tsp};

/// How a successor folds its children's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composer {
    FibonacciSum,
    MandelbrotMerge {
        row_offset: u32,
        rows: u32,
        columns: u32,
    },
    TspMinimum,
}

impl Composer {
    /// Fold partial results. Placeholders are skipped; if nothing but
    /// placeholders arrived the outcome is itself a placeholder.
    pub fn compose(&self, results: &[TaskResult], level: i32) -> Option<ResultValue> {
        let mut values = results.iter().filter_map(TaskResult::value).peekable();
        values.peek()?;

        match self {
            Self::FibonacciSum => Some(ResultValue::Fibonacci(fibonacci::sum(values))),
            Self::MandelbrotMerge {
                row_offset,
                rows,
                columns,
            } => Some(ResultValue::Mandelbrot(mandelbrot::merge(
                values,
                level,
                *row_offset,
                *rows,
                *columns,
            ))),
            Self::TspMinimum => tsp::shortest(values).map(ResultValue::Tsp),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessorState {
    Waiting,
    Ready,
    Composed,
}

/// Outcome of delivering one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinProgress {
    Waiting(usize),
    Ready,
}

#[derive(Debug)]
struct JoinState {
    remaining: usize,
    results: Vec<TaskResult>,
    state: SuccessorState,
}

/// Aggregator awaiting a fixed number of child results.
#[derive(Debug)]
pub struct SuccessorTask {
    id: TaskId,
    join_id: SuccessorId,
    destination: SuccessorId,
    level: i32,
    join_count: usize,
    composer: Composer,
    join: Mutex<JoinState>,
}

impl SuccessorTask {
    /// `join_id` is the identifier the children carry; `destination` is the
    /// successor that receives the composed result. A join count of zero
    /// yields a successor that is ready immediately.
    pub fn new(
        join_id: SuccessorId,
        destination: SuccessorId,
        level: i32,
        composer: Composer,
        join_count: usize,
    ) -> Self {
        let state = if join_count == 0 {
            SuccessorState::Ready
        } else {
            SuccessorState::Waiting
        };
        Self {
            id: TaskId::new(),
            join_id,
            destination,
            level,
            join_count,
            composer,
            join: Mutex::new(JoinState {
                remaining: join_count,
                results: Vec::with_capacity(join_count),
                state,
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn join_id(&self) -> SuccessorId {
        self.join_id
    }

    pub fn destination(&self) -> SuccessorId {
        self.destination
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn join_count(&self) -> usize {
        self.join_count
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn remaining(&self) -> usize {
        self.lock().remaining
    }

    pub fn state(&self) -> SuccessorState {
        self.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SuccessorState::Ready
    }

    fn lock(&self) -> MutexGuard<'_, JoinState> {
        self.join.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one child result. Append and decrement happen under one lock;
    /// `Ready` is returned to exactly one caller.
    pub fn put_argument(&self, result: TaskResult) -> Result<JoinProgress, CoreError> {
        let mut join = self.lock();
        if join.state != SuccessorState::Waiting {
            return Err(CoreError::JoinOverflow(self.join_id));
        }
        join.results.push(result);
        join.remaining -= 1;
        if join.remaining == 0 {
            join.state = SuccessorState::Ready;
            Ok(JoinProgress::Ready)
        } else {
            Ok(JoinProgress::Waiting(join.remaining))
        }
    }

    /// Fold the collected results into a result for the parent level.
    pub fn compose(&self) -> Result<TaskResult, CoreError> {
        let results = {
            let mut join = self.lock();
            match join.state {
                SuccessorState::Ready => {}
                SuccessorState::Waiting => {
                    return Err(CoreError::NotReady {
                        successor: self.join_id,
                        remaining: join.remaining,
                    })
                }
                SuccessorState::Composed => return Err(CoreError::AlreadyComposed(self.join_id)),
            }
            join.state = SuccessorState::Composed;
            std::mem::take(&mut join.results)
        };

        let value = self.composer.compose(&results, self.level);
        tracing::debug!(
            successor_id = %self.join_id,
            level = self.level,
            arguments = results.len(),
            empty = value.is_none(),
            "successor composed"
        );
        Ok(TaskResult::new(value, self.level - 1, self.destination))
    }
}

#[derive(Serialize, Deserialize)]
struct SuccessorSnapshot {
    id: TaskId,
    join_id: SuccessorId,
    destination: SuccessorId,
    level: i32,
    join_count: usize,
    composer: Composer,
    remaining: usize,
    results: Vec<TaskResult>,
    state: SuccessorState,
}

impl Serialize for SuccessorTask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let join = self.lock();
        SuccessorSnapshot {
            id: self.id,
            join_id: self.join_id,
            destination: self.destination,
            level: self.level,
            join_count: self.join_count,
            composer: self.composer.clone(),
            remaining: join.remaining,
            results: join.results.clone(),
            state: join.state,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SuccessorTask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = SuccessorSnapshot::deserialize(deserializer)?;
        Ok(Self {
            id: snapshot.id,
            join_id: snapshot.join_id,
            destination: snapshot.destination,
            level: snapshot.level,
            join_count: snapshot.join_count,
            composer: snapshot.composer,
            join: Mutex::new(JoinState {
                remaining: snapshot.remaining,
                results: snapshot.results,
                state: snapshot.state,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn fib(value: u64, join: SuccessorId) -> TaskResult {
        TaskResult::new(Some(ResultValue::Fibonacci(value)), 1, join)
    }

    #[test]
    fn zero_join_count_is_ready_and_composes_to_placeholder() {
        let parent = SuccessorId::new();
        let successor = SuccessorTask::new(SuccessorId::new(), parent, 2, Composer::TspMinimum, 0);
        assert!(successor.is_ready());

        let result = successor.compose().unwrap();
        assert_eq!(result.value(), None);
        assert_eq!(result.level(), 1);
        assert_eq!(result.successor_id(), parent);
    }

    #[test]
    fn ready_reported_once_then_overflow() {
        let join = SuccessorId::new();
        let successor = SuccessorTask::new(join, SuccessorId::new(), 1, Composer::FibonacciSum, 2);

        assert_eq!(successor.put_argument(fib(1, join)).unwrap(), JoinProgress::Waiting(1));
        assert_eq!(successor.put_argument(fib(2, join)).unwrap(), JoinProgress::Ready);
        assert_eq!(
            successor.put_argument(fib(3, join)),
            Err(CoreError::JoinOverflow(join))
        );
    }

    #[test]
    fn compose_requires_ready_and_happens_once() {
        let join = SuccessorId::new();
        let successor = SuccessorTask::new(join, SuccessorId::new(), 1, Composer::FibonacciSum, 2);
        successor.put_argument(fib(3, join)).unwrap();
        assert!(matches!(
            successor.compose(),
            Err(CoreError::NotReady { remaining: 1, .. })
        ));

        successor.put_argument(fib(5, join)).unwrap();
        let result = successor.compose().unwrap();
        assert_eq!(result.value(), Some(&ResultValue::Fibonacci(8)));
        assert_eq!(result.level(), 0);
        assert_eq!(successor.compose(), Err(CoreError::AlreadyComposed(join)));
    }

    #[test]
    fn placeholder_is_tolerated() {
        let join = SuccessorId::new();
        let successor = SuccessorTask::new(join, SuccessorId::new(), 1, Composer::FibonacciSum, 2);
        successor.put_argument(TaskResult::empty(1, join)).unwrap();
        successor.put_argument(fib(5, join)).unwrap();
        assert_eq!(
            successor.compose().unwrap().value(),
            Some(&ResultValue::Fibonacci(5))
        );
    }

    #[test]
    fn concurrent_arguments_reach_zero_exactly_once() {
        const N: usize = 64;
        let join = SuccessorId::new();
        let successor = Arc::new(SuccessorTask::new(
            join,
            SuccessorId::new(),
            1,
            Composer::FibonacciSum,
            N,
        ));

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let successor = Arc::clone(&successor);
                thread::spawn(move || successor.put_argument(fib(i as u64, join)).unwrap())
            })
            .collect();
        let ready = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|p| *p == JoinProgress::Ready)
            .count();

        assert_eq!(ready, 1);
        assert_eq!(successor.remaining(), 0);
        let expected: u64 = (0..N as u64).sum();
        assert_eq!(
            successor.compose().unwrap().value(),
            Some(&ResultValue::Fibonacci(expected))
        );
    }

    #[test]
    fn snapshot_preserves_join_state() {
        let join = SuccessorId::new();
        let successor = SuccessorTask::new(join, SuccessorId::new(), 3, Composer::FibonacciSum, 2);
        successor.put_argument(fib(1, join)).unwrap();

        let bytes = rmp_serde::to_vec(&successor).unwrap();
        let decoded: SuccessorTask = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded.join_id(), join);
        assert_eq!(decoded.remaining(), 1);
        assert_eq!(decoded.put_argument(fib(1, join)).unwrap(), JoinProgress::Ready);
    }
}
