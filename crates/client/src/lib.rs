pub mod error;
pub mod job;
pub mod jobs;

pub use error::ClientError;
pub use job::Job;
pub use jobs::{EuclideanTspJob, FibonacciJob, MandelbrotImage, MandelbrotJob};
