//! Point-pair correspondences produced by the matcher.

use nalgebra::{Point3, Vector3};

/// A correspondence between one vertex of each set, in world coordinates.
///
/// Slot 1 always belongs to the reference set regardless of which direction
/// the match was found in. The constructor enforces `n1 · n2 >= 0` by flipping
/// `n2` when needed, so the averaged normal used by the solver never cancels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    /// World-space position of the reference-set vertex.
    pub p1: Point3<f64>,
    /// World-space normal of the reference-set vertex.
    pub n1: Vector3<f64>,
    /// World-space position of the matched vertex.
    pub p2: Point3<f64>,
    /// World-space normal of the matched vertex (flipped toward `n1`).
    pub n2: Vector3<f64>,
}

impl PointPair {
    /// Build a pair, flipping `n2` so that `n1 · n2 >= 0`.
    pub fn new(
        p1: Point3<f64>,
        n1: Vector3<f64>,
        p2: Point3<f64>,
        n2: Vector3<f64>,
    ) -> Self {
        let n2 = if n1.dot(&n2) < 0.0 { -n2 } else { n2 };
        Self { p1, n1, p2, n2 }
    }

    /// Squared distance between the paired points.
    #[inline]
    pub fn dist_sq(&self) -> f64 {
        (self.p1 - self.p2).norm_squared()
    }

    /// Dot product of the paired normals (non-negative by construction).
    #[inline]
    pub fn norm_dot(&self) -> f64 {
        self.n1.dot(&self.n2)
    }
}
