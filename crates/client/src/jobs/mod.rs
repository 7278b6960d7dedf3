mod fibonacci;
mod mandelbrot;
mod tsp;

pub use fibonacci::FibonacciJob;
pub use mandelbrot::{MandelbrotImage, MandelbrotJob};
pub use tsp::EuclideanTspJob;
