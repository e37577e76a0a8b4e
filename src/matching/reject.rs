//! Adaptive outlier rejection from per-iteration pair statistics.
//!
//! Each iteration re-derives its thresholds from the medians of the unpruned
//! correspondence list: the distance cutoff is a multiple of the median pair
//! distance, the normal cutoff a multiple of the median normal angle. The
//! same thresholds gate both the pruning below and the *next* iteration's
//! k-d tree queries, so the acceptance window tightens as alignment improves.

use crate::core::types::PointPair;
use crate::matching::config::AlignConfig;
use crate::utils::stats::median;

/// Thresholds derived from one iteration's pair statistics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PairStats {
    /// Median pair distance.
    pub med_dist: f64,
    /// Median pair normal agreement.
    pub med_norm_dot: f64,
    /// New correspondence distance cutoff.
    pub max_dist: f64,
    /// New normal-compatibility dot threshold.
    pub norm_dot_thresh: f64,
}

impl PairStats {
    /// Compute medians and the thresholds they imply.
    pub fn compute(pairs: &[PointPair], cfg: &AlignConfig) -> Self {
        let mut dists: Vec<f64> = pairs.iter().map(|p| p.dist_sq().sqrt()).collect();
        let mut dots: Vec<f64> = pairs.iter().map(|p| p.norm_dot()).collect();
        let med_dist = median(&mut dists);
        let med_norm_dot = median(&mut dots);

        let max_dist = cfg.dist_thresh_mult * med_dist;
        let med_angle = med_norm_dot.clamp(-1.0, 1.0).acos();
        let norm_dot_thresh = (cfg.norm_dot_thresh_mult * med_angle)
            .cos()
            .clamp(cfg.norm_dot_thresh_min, cfg.norm_dot_thresh_max);

        Self {
            med_dist,
            med_norm_dot,
            max_dist,
            norm_dot_thresh,
        }
    }

    /// Drop every pair beyond either threshold.
    pub fn prune(&self, pairs: &mut Vec<PointPair>) {
        let max_dist_sq = self.max_dist * self.max_dist;
        pairs.retain(|p| p.dist_sq() <= max_dist_sq && p.norm_dot() >= self.norm_dot_thresh);
    }
}
