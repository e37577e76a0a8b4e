//! Spatial search structures.

pub mod normals;

use kiddo::float::kdtree::KdTree as FloatKdTree;
use kiddo::SquaredEuclidean;
use nalgebra::Point3;

/// k-d tree type used for vertex lookup.
///
/// Uses a larger leaf bucket than `kiddo`'s default (32) so point sets with
/// many coplanar or collinear points (all sharing a coordinate on some axis)
/// don't overflow a leaf during construction.
type KdTree = FloatKdTree<f64, u64, 3, 256, u32>;

/// k-d tree over the vertices of a point set.
///
/// Stores vertex indices as tree items, so every query answers directly with
/// the index of the matched vertex. Queries take coordinates already expressed
/// in the frame the tree was built in; callers pre-transform.
pub struct VertexTree {
    tree: KdTree,
    len: usize,
}

impl VertexTree {
    /// Build a tree from vertex positions.
    pub fn build(positions: &[Point3<f64>]) -> Self {
        let mut tree: KdTree = KdTree::new();
        for (i, p) in positions.iter().enumerate() {
            tree.add(&[p.x, p.y, p.z], i as u64);
        }
        Self {
            tree,
            len: positions.len(),
        }
    }

    /// Number of indexed vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the tree indexes no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the nearest vertex within `max_dist_sq` of `p`, if any.
    pub fn nearest_within(&self, p: &Point3<f64>, max_dist_sq: f64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let hit = self.tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y, p.z]);
        (hit.distance <= max_dist_sq).then_some(hit.item as usize)
    }

    /// Nearest vertex within `max_dist_sq` that the predicate accepts.
    ///
    /// Candidates are visited in increasing distance order; rejecting the
    /// closest moves on to the next one rather than failing the query.
    pub fn nearest_compatible(
        &self,
        p: &Point3<f64>,
        max_dist_sq: f64,
        accept: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let q = [p.x, p.y, p.z];

        // Common case: the closest candidate passes the predicate.
        let closest = self.tree.nearest_one::<SquaredEuclidean>(&q);
        if closest.distance > max_dist_sq {
            return None;
        }
        if accept(closest.item as usize) {
            return Some(closest.item as usize);
        }

        self.tree
            .within::<SquaredEuclidean>(&q, max_dist_sq)
            .into_iter()
            .map(|hit| hit.item as usize)
            .find(|&i| accept(i))
    }

    /// Indices of the `k` nearest vertices, closest first.
    pub fn nearest_n(&self, p: &Point3<f64>, k: usize) -> Vec<usize> {
        self.tree
            .nearest_n::<SquaredEuclidean>(&[p.x, p.y, p.z], k)
            .into_iter()
            .map(|hit| hit.item as usize)
            .collect()
    }
}
