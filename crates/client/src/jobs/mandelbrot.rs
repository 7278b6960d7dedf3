use fanout_core::{MandelbrotTile, ResultValue, Task, TaskResult, Workload};
use serde::Serialize;

use crate::error::ClientError;
use crate::job::Job;

/// Escape counts for every pixel, `counts[row][column]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MandelbrotImage {
    pub iteration_limit: u32,
    pub counts: Vec<Vec<u32>>,
}

impl MandelbrotImage {
    /// Share of pixels that never escaped.
    pub fn interior_ratio(&self) -> f64 {
        let total: usize = self.counts.iter().map(Vec::len).sum();
        if total == 0 {
            return 0.0;
        }
        let interior = self
            .counts
            .iter()
            .flatten()
            .filter(|&&count| count >= self.iteration_limit)
            .count();
        interior as f64 / total as f64
    }
}

pub struct MandelbrotJob {
    tile: MandelbrotTile,
}

impl MandelbrotJob {
    /// A square image of `pixels` x `pixels` starting at `(lower_x, lower_y)`;
    /// `edge_length` is the side of the whole square.
    pub fn new(
        lower_x: f64,
        lower_y: f64,
        edge_length: f64,
        pixels: u32,
        iteration_limit: u32,
    ) -> Result<Self, ClientError> {
        if pixels == 0 || iteration_limit == 0 {
            return Err(ClientError::InvalidJob(
                "pixels and iteration limit must be positive".into(),
            ));
        }
        let delta = edge_length / f64::from(pixels);
        Ok(Self {
            tile: MandelbrotTile::new(lower_x, lower_y, delta, pixels, pixels, iteration_limit),
        })
    }

    pub fn with_max_level(mut self, max_level: i32) -> Self {
        self.tile = self.tile.with_max_level(max_level);
        self
    }
}

impl Job for MandelbrotJob {
    type Output = MandelbrotImage;

    fn name(&self) -> &'static str {
        "mandelbrot"
    }

    fn root_task(&self) -> Task {
        Task::new(Workload::Mandelbrot(self.tile.clone()))
    }

    fn collect(&self, result: TaskResult) -> Result<MandelbrotImage, ClientError> {
        match result.into_value() {
            Some(ResultValue::Mandelbrot(tiles)) => Ok(MandelbrotImage {
                iteration_limit: self.tile.iteration_limit,
                counts: tiles.assemble(self.tile.row_offset, self.tile.rows, self.tile.columns),
            }),
            other => Err(ClientError::UnexpectedResult {
                job: self.name(),
                detail: format!("{other:?}"),
            }),
        }
    }
}
