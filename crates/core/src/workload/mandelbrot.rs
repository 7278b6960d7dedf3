use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::result::ResultValue;

/// Squared escape radius (|z| < 2).
const ESCAPE_NORM_SQR: f64 = 4.0;

pub const DEFAULT_MAX_LEVEL: i32 = 5;

/// A horizontal band of the complex-plane grid.
///
/// Row `i` walks the real axis from `lower_x`, column `j` walks the imaginary
/// axis from `lower_y`. Counts are stored with columns reversed so that the
/// top of the image is column zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandelbrotTile {
    pub lower_x: f64,
    pub lower_y: f64,
    pub edge_length: f64,
    pub rows: u32,
    pub columns: u32,
    pub iteration_limit: u32,
    /// Index of this tile's first row within the full image.
    pub row_offset: u32,
    pub max_level: i32,
}

impl MandelbrotTile {
    pub fn new(
        lower_x: f64,
        lower_y: f64,
        edge_length: f64,
        rows: u32,
        columns: u32,
        iteration_limit: u32,
    ) -> Self {
        Self {
            lower_x,
            lower_y,
            edge_length,
            rows,
            columns,
            iteration_limit,
            row_offset: 0,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }

    pub fn with_max_level(mut self, max_level: i32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn is_decomposable(&self, level: i32) -> bool {
        level < self.max_level && self.rows >= 2
    }

    /// Split rows in two; the second half takes the odd row.
    pub fn split(&self) -> [MandelbrotTile; 2] {
        let half = self.rows / 2;
        let first = Self {
            rows: half,
            ..self.clone()
        };
        let second = Self {
            lower_x: self.lower_x + self.edge_length * f64::from(half),
            rows: self.rows - half,
            row_offset: self.row_offset + half,
            ..self.clone()
        };
        [first, second]
    }

    pub fn execute(&self) -> ResultValue {
        let rows = self.rows as usize;
        let columns = self.columns as usize;
        let mut counts = vec![vec![0u32; columns]; rows];

        for (i, row) in counts.iter_mut().enumerate() {
            let real = self.lower_x + self.edge_length * i as f64;
            for step in 0..columns {
                let imaginary = self.lower_y + self.edge_length * step as f64;
                row[columns - 1 - step] = self.escape_count(real, imaginary);
            }
        }

        let mut tiles = MandelbrotTiles::default();
        tiles.insert(self.row_offset, counts);
        ResultValue::Mandelbrot(tiles)
    }

    fn escape_count(&self, c_re: f64, c_im: f64) -> u32 {
        let (mut re, mut im) = (c_re, c_im);
        let mut iteration = 0;
        while re * re + im * im < ESCAPE_NORM_SQR && iteration < self.iteration_limit {
            let next_re = re * re - im * im + c_re;
            im = 2.0 * re * im + c_im;
            re = next_re;
            iteration += 1;
        }
        iteration
    }
}

/// Escape-count bands keyed by their first row in the full image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MandelbrotTiles(BTreeMap<u32, Vec<Vec<u32>>>);

impl MandelbrotTiles {
    pub fn insert(&mut self, row_offset: u32, counts: Vec<Vec<u32>>) {
        self.0.insert(row_offset, counts);
    }

    pub fn extend(&mut self, other: MandelbrotTiles) {
        self.0.extend(other.0);
    }

    pub fn get(&self, row_offset: u32) -> Option<&Vec<Vec<u32>>> {
        self.0.get(&row_offset)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paste every band into one `rows x columns` grid whose first row is
    /// `row_offset`. Bands falling outside the grid are clipped.
    pub fn assemble(&self, row_offset: u32, rows: u32, columns: u32) -> Vec<Vec<u32>> {
        let mut grid = vec![vec![0u32; columns as usize]; rows as usize];
        for (&offset, band) in &self.0 {
            let Some(start) = offset.checked_sub(row_offset) else {
                continue;
            };
            for (i, counts) in band.iter().enumerate() {
                let Some(target) = grid.get_mut(start as usize + i) else {
                    break;
                };
                for (cell, value) in target.iter_mut().zip(counts) {
                    *cell = *value;
                }
            }
        }
        grid
    }
}

/// Union of child bands. At level zero the bands are flattened into a single
/// grid keyed at `row_offset`.
pub(crate) fn merge<'a>(
    values: impl Iterator<Item = &'a ResultValue>,
    level: i32,
    row_offset: u32,
    rows: u32,
    columns: u32,
) -> MandelbrotTiles {
    let mut merged = MandelbrotTiles::default();
    for value in values {
        match value {
            ResultValue::Mandelbrot(tiles) => merged.extend(tiles.clone()),
            other => tracing::warn!(?other, "mandelbrot successor ignoring foreign result"),
        }
    }

    if level == 0 {
        let grid = merged.assemble(row_offset, rows, columns);
        let mut single = MandelbrotTiles::default();
        single.insert(row_offset, grid);
        return single;
    }
    merged
}
