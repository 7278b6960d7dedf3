//! Pluggable problem decompositions.
//!
//! Each workload knows how to test whether it should be split, how to split
//! itself, how to compute a leaf, and which composer folds its children's
//! results. The task envelope handles identifiers and level routing.

pub mod fibonacci;
pub mod mandelbrot;
pub mod tsp;

use serde::{Deserialize, Serialize};

use crate::api::SharedAccess;
use crate::result::ResultValue;
use crate::successor::Composer;

pub use fibonacci::Fibonacci;
pub use mandelbrot::{MandelbrotTile, MandelbrotTiles};
pub use tsp::{TspGraph, TspNode, TspTour};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    Fibonacci(Fibonacci),
    Mandelbrot(MandelbrotTile),
    Tsp(TspNode),
}

impl Workload {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fibonacci(_) => "fibonacci",
            Self::Mandelbrot(_) => "mandelbrot",
            Self::Tsp(_) => "tsp",
        }
    }

    pub(crate) fn is_decomposable(&self, level: i32) -> bool {
        match self {
            Self::Fibonacci(fib) => fib.is_decomposable(),
            Self::Mandelbrot(tile) => tile.is_decomposable(level),
            Self::Tsp(node) => node.is_decomposable(level),
        }
    }

    pub(crate) fn execute(&self, shared: &dyn SharedAccess) -> Option<ResultValue> {
        match self {
            Self::Fibonacci(fib) => Some(fib.execute()),
            Self::Mandelbrot(tile) => Some(tile.execute()),
            Self::Tsp(node) => node.execute(shared),
        }
    }

    pub(crate) fn split(&self, shared: &dyn SharedAccess) -> Vec<Workload> {
        match self {
            Self::Fibonacci(fib) => fib.split().into_iter().map(Self::Fibonacci).collect(),
            Self::Mandelbrot(tile) => tile.split().into_iter().map(Self::Mandelbrot).collect(),
            Self::Tsp(node) => node.split(shared).into_iter().map(Self::Tsp).collect(),
        }
    }

    pub(crate) fn composer(&self) -> Composer {
        match self {
            Self::Fibonacci(_) => Composer::FibonacciSum,
            Self::Mandelbrot(tile) => Composer::MandelbrotMerge {
                row_offset: tile.row_offset,
                rows: tile.rows,
                columns: tile.columns,
            },
            Self::Tsp(_) => Composer::TspMinimum,
        }
    }
}
