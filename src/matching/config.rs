//! Configuration for the alignment engine.

use serde::{Deserialize, Serialize};

/// Transformation class the engine solves for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum XformType {
    /// Translation only (3 DoF).
    Translation,
    /// Rigid: rotation + translation (6 DoF).
    #[default]
    Rigid,
    /// Rigid + uniform scale.
    Similarity,
    /// Full affine.
    Affine,
}

/// Configuration for [`align`](crate::align) and friends.
///
/// Defaults reproduce the reference behavior; individual fields exist so
/// tests can tighten or relax the engine without recompiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Transformation class to solve for.
    pub xform_type: XformType,

    /// Maximum main-loop iterations.
    pub max_iters: u32,

    /// Consecutive non-recompute iterations without a new minimum error
    /// before terminating (translation/rigid only).
    pub termination_iter_thresh: u32,

    /// Refinement passes at the higher sampling rate after the main loop.
    pub final_iters: u32,

    /// Minimum surviving correspondences per iteration; fewer fails the call.
    pub min_pairs: usize,

    /// Target correspondence count for main-loop iterations.
    pub desired_pairs: usize,

    /// Target correspondence count for final refinement passes.
    pub desired_pairs_final: usize,

    /// Iterations between sampling-distribution refreshes.
    pub cdf_update_interval: u32,

    /// Discard matches landing on boundary vertices.
    pub reject_boundary: bool,

    /// Gate k-d tree candidates on normal agreement (skipped for point clouds).
    pub use_norm_compat: bool,

    /// Huber knee of the IRLS weighting, and the weight of the
    /// point-to-point regularization rows.
    pub regularization: f64,

    /// New distance cutoff = this multiple of the median pair distance.
    pub dist_thresh_mult: f64,

    /// New normal-angle cutoff = this multiple of the median pair angle.
    pub norm_dot_thresh_mult: f64,

    /// Lower clamp of the normal-compatibility dot threshold.
    pub norm_dot_thresh_min: f64,

    /// Upper clamp of the normal-compatibility dot threshold.
    pub norm_dot_thresh_max: f64,

    /// Initial correspondence distance cutoff; 0.0 derives it from the
    /// occupancy-grid bounding boxes.
    pub max_dist: f64,

    /// Seed for the sampling RNG. `None` seeds from entropy; fixing it makes
    /// iteration order deterministic.
    pub seed: Option<u64>,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            xform_type: XformType::Rigid,
            max_iters: 99,
            termination_iter_thresh: 11,
            final_iters: 2,
            min_pairs: 10,
            desired_pairs: 1000,
            desired_pairs_final: 5000,
            cdf_update_interval: 10,
            reject_boundary: false,
            use_norm_compat: true,
            regularization: 1e-3,
            dist_thresh_mult: 6.0,
            norm_dot_thresh_mult: 1.5,
            norm_dot_thresh_min: 0.5,
            norm_dot_thresh_max: 0.99,
            max_dist: 0.0,
            seed: None,
        }
    }
}

impl AlignConfig {
    /// Default configuration solving for the given transformation class.
    pub fn for_xform(xform_type: XformType) -> Self {
        Self {
            xform_type,
            ..Self::default()
        }
    }
}
