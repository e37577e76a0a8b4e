//! Pairwise alignment engine.
//!
//! The facade functions here wire two [`PointSet`]s into the iteration
//! controller: build the spatial structures that were not supplied, set up
//! per-vertex sampling weights, run the iteration schedule and hand back the
//! final RMS residual. The placement of the second set (`xf2`) is refined in
//! place; on error it may hold partial updates and should be discarded.
//!
//! # Example
//!
//! ```ignore
//! let cfg = AlignConfig::for_xform(XformType::Rigid);
//! let rms = align(&scan_a, &scan_b, &xf_a, &mut xf_b, &cfg)?;
//! ```

mod config;
mod controller;
mod grid;
mod matcher;
mod overlap;
mod reject;
mod reweight;
mod solver;

pub use config::{AlignConfig, XformType};

use nalgebra::Matrix4;
use rayon::prelude::*;
use thiserror::Error;

use crate::core::types::PointSet;
use crate::matching::controller::Engine;
use crate::matching::grid::OccupancyGrid;
use crate::spatial::VertexTree;

/// Alignment failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    /// One of the input sets has no vertices.
    #[error("point set is empty")]
    EmptyPointSet,

    /// A set is missing normals; estimate them first (`ensure_normals`).
    #[error("point set has no normals")]
    MissingNormals,

    /// Too few correspondences survived rejection.
    #[error("only {found} correspondences survived, {required} required")]
    InsufficientPairs {
        /// Surviving correspondence count.
        found: usize,
        /// Minimum required count.
        required: usize,
    },

    /// The sampling distribution collapsed: the sets no longer overlap.
    #[error("point sets do not overlap")]
    NoOverlap,
}

/// Result alias for alignment calls.
pub type AlignResult<T> = Result<T, AlignError>;

fn validate(set1: &PointSet, set2: &PointSet) -> AlignResult<()> {
    if set1.is_empty() || set2.is_empty() {
        return Err(AlignError::EmptyPointSet);
    }
    if !set1.has_normals() || !set2.has_normals() {
        return Err(AlignError::MissingNormals);
    }
    Ok(())
}

/// Align `set2` onto `set1`, refining `xf2` in place.
///
/// Builds k-d trees and occupancy grids internally and samples with uniform
/// weights (refreshed from overlap indicators as the run progresses).
/// Returns the RMS residual of the final refinement pass.
pub fn align(
    set1: &PointSet,
    set2: &PointSet,
    xf1: &Matrix4<f64>,
    xf2: &mut Matrix4<f64>,
    cfg: &AlignConfig,
) -> AlignResult<f64> {
    validate(set1, set2)?;
    let (tree1, tree2) = rayon::join(
        || VertexTree::build(&set1.positions),
        || VertexTree::build(&set2.positions),
    );
    align_with_trees(set1, set2, xf1, xf2, &tree1, &tree2, cfg)
}

/// Like [`align`], but reuses caller-built k-d trees.
///
/// The trees must index `set1.positions` / `set2.positions` in their local
/// (untransformed) frames.
pub fn align_with_trees(
    set1: &PointSet,
    set2: &PointSet,
    xf1: &Matrix4<f64>,
    xf2: &mut Matrix4<f64>,
    tree1: &VertexTree,
    tree2: &VertexTree,
    cfg: &AlignConfig,
) -> AlignResult<f64> {
    let mut weights1 = Vec::new();
    let mut weights2 = Vec::new();
    align_weighted(
        set1,
        set2,
        xf1,
        xf2,
        tree1,
        tree2,
        &mut weights1,
        &mut weights2,
        cfg.max_dist,
        cfg,
    )
}

/// Full-control entry point with caller-managed per-vertex weights.
///
/// Weights whose lengths match the vertex counts are used as-is and left
/// untouched for reuse across calls. Otherwise both buffers are filled with
/// synthesized weights for the duration of the call and cleared again before
/// returning, on every exit path.
#[allow(clippy::too_many_arguments)]
pub fn align_weighted(
    set1: &PointSet,
    set2: &PointSet,
    xf1: &Matrix4<f64>,
    xf2: &mut Matrix4<f64>,
    tree1: &VertexTree,
    tree2: &VertexTree,
    weights1: &mut Vec<f64>,
    weights2: &mut Vec<f64>,
    max_dist: f64,
    cfg: &AlignConfig,
) -> AlignResult<f64> {
    validate(set1, set2)?;

    let (grid1, grid2) = rayon::join(
        || OccupancyGrid::build(&set1.positions),
        || OccupancyGrid::build(&set2.positions),
    );

    let synthesized = weights1.len() != set1.len() || weights2.len() != set2.len();
    if synthesized {
        weights1.clear();
        weights1.resize(set1.len(), 1.0);
        weights2.clear();
        weights2.resize(set2.len(), 1.0);
    }

    let result = Engine::new(
        set1,
        set2,
        xf1,
        xf2,
        tree1,
        tree2,
        &grid1,
        &grid2,
        weights1,
        weights2,
        synthesized,
        max_dist,
        cfg,
    )
    .and_then(Engine::run);

    if synthesized {
        weights1.clear();
        weights2.clear();
    }
    result
}

/// RMS nearest-neighbor residual of `set2` against `set1` under the given
/// placements, over matches within `max_dist`.
///
/// A post-hoc quality number, independent of the engine's own error values.
/// `None` when no vertex of `set2` finds a neighbor within the cutoff.
pub fn evaluate(
    set1: &PointSet,
    set2: &PointSet,
    xf1: &Matrix4<f64>,
    xf2: &Matrix4<f64>,
    max_dist: f64,
) -> Option<f64> {
    if set1.is_empty() || set2.is_empty() {
        return None;
    }
    let tree1 = VertexTree::build(&set1.positions);
    let xf1_inv = xf1.try_inverse().unwrap_or_else(Matrix4::identity);
    let xf_2to1 = xf1_inv * xf2;
    let max_dist_sq = max_dist * max_dist;

    let (sum, count) = set2
        .positions
        .par_iter()
        .map(|p| {
            let q = xf_2to1.transform_point(p);
            match tree1.nearest_within(&q, max_dist_sq) {
                Some(j) => {
                    let w1 = xf1.transform_point(&set1.position(j));
                    let w2 = xf2.transform_point(p);
                    ((w1 - w2).norm_squared(), 1usize)
                }
                None => (0.0, 0),
            }
        })
        .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    (count > 0).then(|| (sum / count as f64).sqrt())
}
