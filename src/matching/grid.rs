//! Dilated occupancy grid for fast overlap rejection.
//!
//! A coarse 16x16x16 grid over the bounding box of a point set. Cells
//! containing a point are marked, then dilated by one cell in all 26 neighbor
//! directions, so a containment query answers "is there an input point within
//! roughly one cell of here" without touching the k-d tree.

use nalgebra::Point3;
use rayon::prelude::*;

/// Cells per axis.
const GRID_DIM: usize = 16;
/// Total cell count.
const GRID_CELLS: usize = GRID_DIM * GRID_DIM * GRID_DIM;

/// Dilated 16^3 occupancy grid over a point set's bounding box.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    min: Point3<f64>,
    max: Point3<f64>,
    scale: f64,
    cells: Vec<u8>,
}

impl OccupancyGrid {
    /// Build the grid from a non-empty set of points.
    pub fn build(points: &[Point3<f64>]) -> Self {
        let mut min = points.first().copied().unwrap_or_else(Point3::origin);
        let mut max = min;
        for p in points {
            for a in 0..3 {
                min[a] = min[a].min(p[a]);
                max[a] = max[a].max(p[a]);
            }
        }
        let extent = (max.x - min.x).max(max.y - min.y).max(max.z - min.z);
        let scale = GRID_DIM as f64 / extent.max(1e-12);

        let mut marked = vec![0u8; GRID_CELLS];
        for p in points {
            let (x, y, z) = Self::cell_of(&min, scale, p);
            marked[Self::cell_index(x, y, z)] = 1;
        }

        // Dilate: a cell is set iff any of its 27 clamped neighbors was marked.
        let cells: Vec<u8> = (0..GRID_CELLS)
            .into_par_iter()
            .map(|idx| {
                let x = idx / (GRID_DIM * GRID_DIM);
                let y = (idx / GRID_DIM) % GRID_DIM;
                let z = idx % GRID_DIM;
                for dx in -1i64..=1 {
                    for dy in -1i64..=1 {
                        for dz in -1i64..=1 {
                            let nx = (x as i64 + dx).clamp(0, GRID_DIM as i64 - 1) as usize;
                            let ny = (y as i64 + dy).clamp(0, GRID_DIM as i64 - 1) as usize;
                            let nz = (z as i64 + dz).clamp(0, GRID_DIM as i64 - 1) as usize;
                            if marked[Self::cell_index(nx, ny, nz)] != 0 {
                                return 1;
                            }
                        }
                    }
                }
                0
            })
            .collect();

        Self {
            min,
            max,
            scale,
            cells,
        }
    }

    #[inline]
    fn cell_index(x: usize, y: usize, z: usize) -> usize {
        (x * GRID_DIM + y) * GRID_DIM + z
    }

    #[inline]
    fn cell_of(min: &Point3<f64>, scale: f64, p: &Point3<f64>) -> (usize, usize, usize) {
        let clamp = |v: f64| (v as usize).min(GRID_DIM - 1);
        (
            clamp((p.x - min.x) * scale),
            clamp((p.y - min.y) * scale),
            clamp((p.z - min.z) * scale),
        )
    }

    /// Whether `p` lies inside the bounding box and in a dilated cell.
    pub fn overlaps(&self, p: &Point3<f64>) -> bool {
        if p.x < self.min.x
            || p.y < self.min.y
            || p.z < self.min.z
            || p.x > self.max.x
            || p.y > self.max.y
            || p.z > self.max.z
        {
            return false;
        }
        let (x, y, z) = Self::cell_of(&self.min, self.scale, p);
        self.cells[Self::cell_index(x, y, z)] != 0
    }

    /// Largest extent of the bounding box.
    #[inline]
    pub fn bbox_size(&self) -> f64 {
        (self.max.x - self.min.x)
            .max(self.max.y - self.min.y)
            .max(self.max.z - self.min.z)
    }
}
