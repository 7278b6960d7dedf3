use serde::{Deserialize, Serialize};

use crate::result::ResultValue;

/// Naive doubly-recursive Fibonacci: fib(n) = fib(n-1) + fib(n-2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fibonacci {
    pub n: u32,
}

impl Fibonacci {
    pub fn new(n: u32) -> Self {
        Self { n }
    }

    pub fn is_decomposable(&self) -> bool {
        self.n > 1
    }

    /// Base cases fib(0) = 0 and fib(1) = 1.
    pub fn execute(&self) -> ResultValue {
        ResultValue::Fibonacci(u64::from(self.n))
    }

    /// fib(n-1) and fib(n-2); a base case has no predecessors.
    pub fn split(&self) -> Vec<Fibonacci> {
        if !self.is_decomposable() {
            return Vec::new();
        }
        vec![Self::new(self.n - 1), Self::new(self.n - 2)]
    }
}

/// Sum of the Fibonacci partials, skipping placeholders. fib(n) fits a
/// `u64` up to n = 93; past that the sum saturates at `u64::MAX`.
pub(crate) fn sum<'a>(values: impl Iterator<Item = &'a ResultValue>) -> u64 {
    let mut total: u64 = 0;
    for value in values {
        match value {
            ResultValue::Fibonacci(n) => {
                total = total.checked_add(*n).unwrap_or_else(|| {
                    tracing::warn!(partial = *n, "fibonacci sum overflowed u64, saturating");
                    u64::MAX
                });
            }
            other => tracing::warn!(?other, "fibonacci successor ignoring foreign result"),
        }
    }
    total
}
