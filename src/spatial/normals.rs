//! Normal estimation for unstructured point clouds.
//!
//! PCA over the k nearest neighbors of each vertex: the covariance of the
//! neighborhood is eigendecomposed and the eigenvector of the smallest
//! eigenvalue is taken as the surface normal. Orientation is local only
//! (flipped away from the neighborhood centroid); consumers must not rely on
//! a globally consistent sign.

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rayon::prelude::*;

use super::VertexTree;

/// Estimate unit normals for every position from its `k` nearest neighbors.
///
/// Degenerate neighborhoods (fewer than 3 points) get a +z normal.
pub fn estimate_normals(positions: &[Point3<f64>], k: usize) -> Vec<Vector3<f64>> {
    let tree = VertexTree::build(positions);

    positions
        .par_iter()
        .map(|p| {
            let neighbors = tree.nearest_n(p, k.max(3));
            if neighbors.len() < 3 {
                return Vector3::z();
            }

            let mut centroid = Vector3::zeros();
            for &i in &neighbors {
                centroid += positions[i].coords;
            }
            centroid /= neighbors.len() as f64;

            let mut cov = Matrix3::zeros();
            for &i in &neighbors {
                let d = positions[i].coords - centroid;
                cov += d * d.transpose();
            }
            cov /= neighbors.len() as f64;

            let eigen = SymmetricEigen::new(cov);
            let mut min_idx = 0;
            for i in 1..3 {
                if eigen.eigenvalues[i] < eigen.eigenvalues[min_idx] {
                    min_idx = i;
                }
            }
            let normal: Vector3<f64> = eigen.eigenvectors.column(min_idx).into_owned();
            let normal = normal.normalize();

            // Flat neighborhood centered on the vertex gives no cue; point the
            // normal away from the local centroid so nearby estimates agree.
            if normal.dot(&(p.coords - centroid)) < 0.0 {
                -normal
            } else {
                normal
            }
        })
        .collect()
}
