//! 3D point set with per-vertex normals.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::spatial::normals::estimate_normals;

/// An ordered collection of 3D vertices with unit normals.
///
/// This is the point container consumed by the alignment engine. Normals are
/// required for matching and for the point-to-plane solver; for unstructured
/// clouds they can be estimated with [`PointSet::ensure_normals`].
///
/// Optional per-vertex boundary flags mark vertices on an open mesh border,
/// where normals are unreliable. Matches landing on flagged vertices are
/// discarded when boundary rejection is enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointSet {
    /// Vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// Unit normals, same length as `positions` (or empty until estimated).
    pub normals: Vec<Vector3<f64>>,
    /// Optional per-vertex boundary flags, same length as `positions`.
    pub boundary: Option<Vec<bool>>,
    /// True iff no face/connectivity structure backs the normals.
    ///
    /// Point clouds get estimated normals whose orientation is unreliable, so
    /// the matcher will not gate k-d tree queries on normal agreement for them.
    pub is_point_cloud: bool,
}

impl PointSet {
    /// Create a point set from bare positions (no normals yet).
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            boundary: None,
            is_point_cloud: false,
        }
    }

    /// Create a point set with positions and matching normals.
    pub fn with_normals(positions: Vec<Point3<f64>>, normals: Vec<Vector3<f64>>) -> Self {
        debug_assert_eq!(positions.len(), normals.len());
        Self {
            positions,
            normals,
            boundary: None,
            is_point_cloud: false,
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the set has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Vertex position at index.
    #[inline]
    pub fn position(&self, i: usize) -> Point3<f64> {
        self.positions[i]
    }

    /// Vertex normal at index.
    #[inline]
    pub fn normal(&self, i: usize) -> Vector3<f64> {
        self.normals[i]
    }

    /// Whether the vertex lies on a mesh boundary.
    ///
    /// Sets without boundary information report `false` for every vertex.
    #[inline]
    pub fn is_boundary(&self, i: usize) -> bool {
        self.boundary.as_ref().is_some_and(|b| b[i])
    }

    /// True when every vertex has a normal.
    #[inline]
    pub fn has_normals(&self) -> bool {
        self.normals.len() == self.positions.len() && !self.positions.is_empty()
    }

    /// Make sure normals exist, estimating them from the `k` nearest
    /// neighbors of each vertex when absent.
    ///
    /// Estimation marks the set as a point cloud: PCA normals have no
    /// consistent global orientation, so downstream normal gating is skipped.
    pub fn ensure_normals(&mut self, k: usize) {
        if self.has_normals() || self.is_empty() {
            return;
        }
        self.normals = estimate_normals(&self.positions, k);
        self.is_point_cloud = true;
    }

    /// Axis-aligned bounding box, or `None` for an empty set.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.positions.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.positions[1..] {
            for a in 0..3 {
                min[a] = min[a].min(p[a]);
                max[a] = max[a].max(p[a]);
            }
        }
        Some((min, max))
    }

    /// Length of the bounding box diagonal (0.0 for an empty set).
    pub fn bbox_diagonal(&self) -> f64 {
        self.bounds()
            .map(|(min, max)| (max - min).norm())
            .unwrap_or(0.0)
    }
}
