//! Jobs run end to end against an in-process Space and worker.

use std::sync::Arc;
use std::time::Duration;

use fanout_client::{EuclideanTspJob, FibonacciJob, Job, MandelbrotJob};
use fanout_computer::LocalComputer;
use fanout_space::Space;

async fn cluster(threads: usize) -> (Arc<Space>, Arc<LocalComputer>) {
    let space = Space::new();
    let computer = Arc::new(LocalComputer::new(threads).unwrap());
    let proxy = space.register(computer.clone(), computer.capacity()).await;
    computer.attach(proxy);
    (space, computer)
}

async fn run<J: Job>(space: &Space, job: &J) -> J::Output {
    tokio::time::timeout(Duration::from_secs(30), job.run(space))
        .await
        .expect("job timed out")
        .expect("job failed")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fibonacci_job() {
    let (space, _computer) = cluster(2).await;
    assert_eq!(run(&space, &FibonacciJob::new(15)).await, 610);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mandelbrot_job_matches_direct_computation() {
    let (space, _computer) = cluster(2).await;
    let job = MandelbrotJob::new(-2.0, -1.5, 3.0, 16, 64).unwrap().with_max_level(3);
    let distributed = run(&space, &job).await;

    let single = MandelbrotJob::new(-2.0, -1.5, 3.0, 16, 64).unwrap().with_max_level(0);
    let direct = run(&space, &single).await;

    assert_eq!(distributed.counts.len(), 16);
    assert_eq!(distributed, direct);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tsp_job_beats_a_bad_greedy_seed() {
    let (space, _computer) = cluster(2).await;
    // Nearest neighbour walks the long way round this zigzag.
    let cities = [(0.0, 0.0), (1.0, 0.0), (-1.5, 0.0), (3.5, 0.0), (-6.0, 0.0), (10.0, 0.0)];
    let job = EuclideanTspJob::new(&cities).unwrap().with_max_level(2);
    let tour = run(&space, &job).await;

    assert!((tour.distance - 32.0).abs() < 1e-9, "got {}", tour.distance);
    assert!(tour.distance < job.greedy_tour().distance);
    let mut visited = tour.cities.clone();
    visited.sort_unstable();
    assert_eq!(visited, (0..cities.len()).collect::<Vec<_>>());
}
