pub mod api;
pub mod container;
pub mod error;
pub mod result;
pub mod shared;
pub mod successor;
pub mod task;
pub mod types;
pub mod workload;

pub use api::*;
pub use container::*;
pub use error::*;
pub use result::*;
pub use shared::*;
pub use successor::*;
pub use task::*;
pub use types::*;
pub use workload::{
    Fibonacci, MandelbrotTile, MandelbrotTiles, TspGraph, TspNode, TspTour, Workload,
};
