//! Correspondence generation: CDF-driven sampling + k-d tree matching.

use nalgebra::Matrix4;
use rand::Rng;
use rand::rngs::StdRng;

use crate::core::math::normal_xf;
use crate::core::types::{PointPair, PointSet};
use crate::sampling::Cdf;
use crate::spatial::VertexTree;

/// Per-iteration matching parameters, updated by the rejection statistics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MatchParams {
    /// CDF step between consecutive samples; ~`1/cdf_incr` samples per set.
    pub cdf_incr: f64,
    /// Correspondence distance cutoff.
    pub max_dist: f64,
    /// Normal-compatibility dot threshold for k-d tree gating.
    pub norm_dot_thresh: f64,
    /// Gate candidates on normal agreement at all.
    pub use_norm_compat: bool,
    /// Discard matches landing on boundary vertices.
    pub reject_boundary: bool,
}

/// Sample vertices of `source` from `cdf` and match each against `target`.
///
/// Samples are drawn at a fixed CDF spacing from a random offset, transformed
/// into the target's frame and matched through the k-d tree within the
/// distance cutoff. When both sets have trustworthy normals, candidates whose
/// normal disagrees with the transformed source normal are rejected during
/// the tree query itself, which re-enters siblings instead of failing.
///
/// Emitted pairs are in world coordinates. `flip` swaps the roles so that
/// slot 1 is always the reference set no matter which direction was matched.
#[allow(clippy::too_many_arguments)]
pub(crate) fn select_and_match(
    source: &PointSet,
    target: &PointSet,
    xf_source: &Matrix4<f64>,
    xf_target: &Matrix4<f64>,
    target_tree: &VertexTree,
    cdf: &Cdf,
    params: &MatchParams,
    flip: bool,
    rng: &mut StdRng,
    pairs: &mut Vec<PointPair>,
) {
    if cdf.is_empty() || params.cdf_incr <= 0.0 {
        return;
    }

    let xf_target_inv = xf_target.try_inverse().unwrap_or_else(Matrix4::identity);
    // Source local -> target local, for querying the target's tree.
    let xf_s2t = xf_target_inv * xf_source;
    let nxf_s2t = normal_xf(&xf_s2t);

    let nxf_source = normal_xf(xf_source);
    let nxf_target = normal_xf(xf_target);

    let max_dist_sq = params.max_dist * params.max_dist;
    let trust_normals =
        params.use_norm_compat && !source.is_point_cloud && !target.is_point_cloud;

    let mut v = rng.gen_range(0.0..params.cdf_incr);
    while v < 1.0 {
        let idx = cdf.index_above(v);
        v += params.cdf_incr;

        let sp = source.position(idx);
        let sn = source.normal(idx);

        let q = xf_s2t.transform_point(&sp);
        let matched = if trust_normals {
            let qn = (nxf_s2t * sn).normalize();
            target_tree.nearest_compatible(&q, max_dist_sq, |j| {
                target.normal(j).dot(&qn) > params.norm_dot_thresh
            })
        } else {
            target_tree.nearest_within(&q, max_dist_sq)
        };
        let Some(j) = matched else {
            continue;
        };
        if params.reject_boundary && target.is_boundary(j) {
            continue;
        }

        let ps = xf_source.transform_point(&sp);
        let ns = (nxf_source * sn).normalize();
        let pt = xf_target.transform_point(&target.position(j));
        let nt = (nxf_target * target.normal(j)).normalize();

        let pair = if flip {
            PointPair::new(pt, nt, ps, ns)
        } else {
            PointPair::new(ps, ns, pt, nt)
        };
        pairs.push(pair);
    }
}
