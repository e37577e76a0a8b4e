//! Per-vertex overlap indicators between the two sets.
//!
//! A vertex overlaps the other set when, transformed into the other's frame,
//! it passes the other's dilated occupancy grid and finds a k-d tree neighbor
//! within the distance cutoff. The 0/1 indicators become sampling weights, so
//! vertices outside the common support stop attracting samples.

use nalgebra::Matrix4;
use rayon::prelude::*;

use crate::core::types::PointSet;
use crate::matching::grid::OccupancyGrid;
use crate::spatial::VertexTree;

/// Overlap indicators of one set against the other.
///
/// `xf_own_to_other` maps the set's local frame into the other set's local
/// frame (the frame its grid and tree were built in).
fn indicators(
    set: &PointSet,
    xf_own_to_other: &Matrix4<f64>,
    other_tree: &VertexTree,
    other_grid: &OccupancyGrid,
    max_dist_sq: f64,
) -> Vec<f64> {
    set.positions
        .par_iter()
        .map(|p| {
            let q = xf_own_to_other.transform_point(p);
            if !other_grid.overlaps(&q) {
                return 0.0;
            }
            match other_tree.nearest_within(&q, max_dist_sq) {
                Some(_) => 1.0,
                None => 0.0,
            }
        })
        .collect()
}

/// Compute 0/1 overlap indicators for both sets.
///
/// `max_dist <= 0` is replaced by the smaller of the two grid bounding-box
/// sizes before use.
#[allow(clippy::too_many_arguments)]
pub(crate) fn compute_overlaps(
    set1: &PointSet,
    set2: &PointSet,
    xf1: &Matrix4<f64>,
    xf2: &Matrix4<f64>,
    tree1: &VertexTree,
    tree2: &VertexTree,
    grid1: &OccupancyGrid,
    grid2: &OccupancyGrid,
    max_dist: f64,
) -> (Vec<f64>, Vec<f64>) {
    let max_dist = if max_dist <= 0.0 {
        grid1.bbox_size().min(grid2.bbox_size())
    } else {
        max_dist
    };
    let max_dist_sq = max_dist * max_dist;

    let xf1_inv = xf1.try_inverse().unwrap_or_else(Matrix4::identity);
    let xf2_inv = xf2.try_inverse().unwrap_or_else(Matrix4::identity);
    let xf_1to2 = xf2_inv * xf1;
    let xf_2to1 = xf1_inv * xf2;

    let o1 = indicators(set1, &xf_1to2, tree2, grid2, max_dist_sq);
    let o2 = indicators(set2, &xf_2to1, tree1, grid1, max_dist_sq);
    (o1, o2)
}
