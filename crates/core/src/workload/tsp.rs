//! Euclidean travelling salesman by branch and bound.
//!
//! Every tour starts and ends at city 0. A node is a partial path; its lower
//! bound is the path length plus, for every edge the tour still needs, half of
//! the cheapest edge each endpoint could use. Nodes whose bound is not below
//! the shared upper bound are discarded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::SharedAccess;
use crate::result::ResultValue;
use crate::shared::Shared;

pub const DEFAULT_MAX_LEVEL: i32 = 3;

/// Distance table plus the two cheapest incident edges of every city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TspGraph {
    distances: Vec<Vec<f64>>,
    cheapest: Vec<[f64; 2]>,
}

impl TspGraph {
    pub fn from_cities(cities: &[(f64, f64)]) -> Self {
        let distances: Vec<Vec<f64>> = cities
            .iter()
            .map(|&(x1, y1)| {
                cities
                    .iter()
                    .map(|&(x2, y2)| ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt())
                    .collect()
            })
            .collect();

        let cheapest = distances
            .iter()
            .enumerate()
            .map(|(city, row)| {
                let mut first = f64::INFINITY;
                let mut second = f64::INFINITY;
                for (other, &d) in row.iter().enumerate() {
                    if other == city {
                        continue;
                    }
                    if d < first {
                        second = first;
                        first = d;
                    } else if d < second {
                        second = d;
                    }
                }
                // With two cities the tour uses the single edge twice.
                match (first.is_finite(), second.is_finite()) {
                    (true, true) => [first, second],
                    (true, false) => [first, first],
                    _ => [0.0, 0.0],
                }
            })
            .collect();

        Self {
            distances,
            cheapest,
        }
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from][to]
    }

    /// Length of a closed tour through `cities` in order.
    pub fn tour_length(&self, cities: &[usize]) -> f64 {
        match (cities.first(), cities.last()) {
            (Some(&first), Some(&last)) => {
                cities
                    .windows(2)
                    .map(|pair| self.distance(pair[0], pair[1]))
                    .sum::<f64>()
                    + self.distance(last, first)
            }
            _ => 0.0,
        }
    }

    fn lower_bound(&self, last: usize, visited_distance: f64, remaining: &[usize]) -> f64 {
        if remaining.is_empty() {
            return visited_distance + self.distance(last, 0);
        }
        let interior: f64 = remaining
            .iter()
            .map(|&city| (self.cheapest[city][0] + self.cheapest[city][1]) / 2.0)
            .sum();
        visited_distance + interior + (self.cheapest[last][0] + self.cheapest[0][0]) / 2.0
    }
}

/// A complete tour found by the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TspTour {
    pub cities: Vec<usize>,
    pub distance: f64,
}

/// A partial path in the search tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TspNode {
    graph: Arc<TspGraph>,
    visited: Vec<usize>,
    remaining: Vec<usize>,
    visited_distance: f64,
    lower_bound: f64,
    #[serde(default = "default_max_level")]
    max_level: i32,
}

fn default_max_level() -> i32 {
    DEFAULT_MAX_LEVEL
}

impl TspNode {
    /// Root of the search: the path holding only city 0.
    pub fn root(graph: TspGraph) -> Self {
        let remaining: Vec<usize> = (1..graph.len()).collect();
        let lower_bound = graph.lower_bound(0, 0.0, &remaining);
        Self {
            graph: Arc::new(graph),
            visited: vec![0],
            remaining,
            visited_distance: 0.0,
            lower_bound,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }

    pub fn with_max_level(mut self, max_level: i32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn graph(&self) -> &TspGraph {
        &self.graph
    }

    pub fn visited(&self) -> &[usize] {
        &self.visited
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn is_decomposable(&self, level: i32) -> bool {
        level < self.max_level && !self.is_complete()
    }

    /// Extend the path by each remaining city.
    fn extensions(&self) -> impl Iterator<Item = TspNode> + '_ {
        let last = self.visited.last().copied().unwrap_or(0);
        (0..self.remaining.len()).map(move |index| {
            let mut remaining = self.remaining.clone();
            let city = remaining.remove(index);
            let mut visited = self.visited.clone();
            visited.push(city);
            let visited_distance = self.visited_distance + self.graph.distance(last, city);
            let lower_bound = self.graph.lower_bound(city, visited_distance, &remaining);
            TspNode {
                graph: Arc::clone(&self.graph),
                visited,
                remaining,
                visited_distance,
                lower_bound,
                max_level: self.max_level,
            }
        })
    }

    /// Children whose bound beats the worker's current shared bound. May be
    /// empty, which prunes this branch.
    pub fn split(&self, shared: &dyn SharedAccess) -> Vec<TspNode> {
        let bound = shared.shared();
        self.extensions()
            .filter(|child| Shared::new(child.lower_bound).is_newer_than(bound.as_ref()))
            .collect()
    }

    /// Depth-first search under this node. The shared bound is re-read on
    /// every step so improvements from other workers prune this search too.
    pub fn execute(&self, shared: &dyn SharedAccess) -> Option<ResultValue> {
        let mut best: Option<TspTour> = None;
        let mut stack = vec![self.clone()];

        while let Some(node) = stack.pop() {
            let bound = match (shared.shared(), &best) {
                (Some(s), Some(tour)) => Some(Shared::new(s.get().min(tour.distance))),
                (Some(s), None) => Some(s),
                (None, Some(tour)) => Some(Shared::new(tour.distance)),
                (None, None) => None,
            };
            if !Shared::new(node.lower_bound).is_newer_than(bound.as_ref()) {
                continue;
            }

            if node.is_complete() {
                let distance = node.lower_bound;
                shared.propose(Shared::new(distance));
                best = Some(TspTour {
                    cities: node.visited,
                    distance,
                });
            } else {
                stack.extend(node.extensions());
            }
        }

        best.map(ResultValue::Tsp)
    }
}

/// Shortest tour among the children; `None` if every branch came back empty.
pub(crate) fn shortest<'a>(values: impl Iterator<Item = &'a ResultValue>) -> Option<TspTour> {
    values
        .filter_map(|value| match value {
            ResultValue::Tsp(tour) => Some(tour),
            other => {
                tracing::warn!(?other, "tsp successor ignoring foreign result");
                None
            }
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SharedCell;

    fn square() -> TspGraph {
        TspGraph::from_cities(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])
    }

    #[test]
    fn cheapest_edges_are_sorted() {
        let graph = TspGraph::from_cities(&[(0.0, 0.0), (0.0, 1.0), (0.0, 3.0)]);
        assert_eq!(graph.cheapest[0], [1.0, 3.0]);
        assert_eq!(graph.cheapest[1], [1.0, 2.0]);
    }

    #[test]
    fn root_bound_never_exceeds_optimum() {
        let node = TspNode::root(square());
        assert!(node.lower_bound() <= 4.0 + 1e-9);
    }

    #[test]
    fn execute_finds_the_perimeter() {
        let cell = SharedCell::new();
        let Some(ResultValue::Tsp(tour)) = TspNode::root(square()).execute(&cell) else {
            panic!("expected a tour");
        };
        assert!((tour.distance - 4.0).abs() < 1e-9);
        assert_eq!(tour.cities.len(), 4);
        assert_eq!(cell.get().map(|s| s.get()), Some(tour.distance));
    }

    #[test]
    fn tight_shared_bound_prunes_everything() {
        let cell = SharedCell::with_value(Shared::new(1.0));
        let root = TspNode::root(square());
        assert!(root.split(&cell).is_empty());
        assert!(root.execute(&cell).is_none());
    }

    #[test]
    fn unset_bound_keeps_every_child() {
        let cell = SharedCell::new();
        assert_eq!(TspNode::root(square()).split(&cell).len(), 3);
    }

    #[test]
    fn shortest_picks_minimum() {
        let values = [
            ResultValue::Tsp(TspTour {
                cities: vec![0, 2, 1],
                distance: 9.0,
            }),
            ResultValue::Tsp(TspTour {
                cities: vec![0, 1, 2],
                distance: 7.5,
            }),
        ];
        assert_eq!(shortest(values.iter()).map(|t| t.distance), Some(7.5));
    }
}
