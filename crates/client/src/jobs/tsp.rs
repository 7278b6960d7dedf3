use fanout_core::{ResultValue, Shared, Task, TaskResult, TspGraph, TspNode, TspTour, Workload};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::job::Job;

/// Branch-and-bound search for the shortest closed tour through `cities`,
/// starting and ending at city 0.
pub struct EuclideanTspJob {
    graph: TspGraph,
    greedy: TspTour,
    max_level: Option<i32>,
}

impl EuclideanTspJob {
    pub fn new(cities: &[(f64, f64)]) -> Result<Self, ClientError> {
        if cities.len() < 2 {
            return Err(ClientError::InvalidJob(format!(
                "a tour needs at least 2 cities, got {}",
                cities.len()
            )));
        }
        let graph = TspGraph::from_cities(cities);
        let greedy = nearest_neighbour(&graph);
        debug!(distance = greedy.distance, "greedy seed tour");
        Ok(Self {
            graph,
            greedy,
            max_level: None,
        })
    }

    pub fn with_max_level(mut self, max_level: i32) -> Self {
        self.max_level = Some(max_level);
        self
    }

    /// The nearest-neighbour tour used to seed the upper bound.
    pub fn greedy_tour(&self) -> &TspTour {
        &self.greedy
    }
}

/// Visit the closest unvisited city until none remain, then return home.
fn nearest_neighbour(graph: &TspGraph) -> TspTour {
    let mut remaining: Vec<usize> = (1..graph.len()).collect();
    let mut cities = vec![0];
    let mut current = 0;
    while !remaining.is_empty() {
        let mut best = 0;
        for (i, &city) in remaining.iter().enumerate() {
            if graph.distance(current, city) < graph.distance(current, remaining[best]) {
                best = i;
            }
        }
        current = remaining.remove(best);
        cities.push(current);
    }
    let distance = graph.tour_length(&cities);
    TspTour { cities, distance }
}

impl Job for EuclideanTspJob {
    type Output = TspTour;

    fn name(&self) -> &'static str {
        "tsp"
    }

    fn root_task(&self) -> Task {
        let mut node = TspNode::root(self.graph.clone());
        if let Some(max_level) = self.max_level {
            node = node.with_max_level(max_level);
        }
        Task::new(Workload::Tsp(node))
    }

    fn seed(&self) -> Option<Shared> {
        Some(Shared::new(self.greedy.distance))
    }

    /// Every branch pruned against the seed means the greedy tour was
    /// already optimal.
    fn collect(&self, result: TaskResult) -> Result<TspTour, ClientError> {
        match result.into_value() {
            Some(ResultValue::Tsp(tour)) if tour.distance < self.greedy.distance => Ok(tour),
            Some(ResultValue::Tsp(_)) | None => {
                info!("no tour beats the greedy seed");
                Ok(self.greedy.clone())
            }
            Some(other) => Err(ClientError::UnexpectedResult {
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
    fn needs_two_cities() {
        assert!(EuclideanTspJob::new(&[(0.0, 0.0)]).is_err());
    }

    #[test]
    fn greedy_visits_every_city_once() {
        let job = EuclideanTspJob::new(&[(0.0, 0.0), (5.0, 0.0), (1.0, 0.0), (3.0, 0.0)]).unwrap();
        let tour = job.greedy_tour();
        assert_eq!(tour.cities, vec![0, 2, 3, 1]);
        assert!((tour.distance - 10.0).abs() < 1e-9);
        assert_eq!(job.seed(), Some(Shared::new(tour.distance)));
    }

    #[test]
    fn placeholder_falls_back_to_greedy() {
        let job = EuclideanTspJob::new(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]).unwrap();
        let tour = job.collect(TaskResult::empty(FINAL_LEVEL, SuccessorId::new())).unwrap();
        assert_eq!(&tour, job.greedy_tour());
    }
}
