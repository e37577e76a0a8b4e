//! Iteration control: convergence, transform-type promotion, refinement.

use nalgebra::Matrix4;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::core::math::orthogonalize;
use crate::core::types::{PointPair, PointSet};
use crate::matching::config::{AlignConfig, XformType};
use crate::matching::grid::OccupancyGrid;
use crate::matching::matcher::{MatchParams, select_and_match};
use crate::matching::overlap::compute_overlaps;
use crate::matching::reject::PairStats;
use crate::matching::reweight::importance_cdf;
use crate::matching::solver::{
    RigidSolve, align_symmetric, align_translation, apply_scale, centroids, rms_scale,
};
use crate::matching::{AlignError, AlignResult};
use crate::sampling::Cdf;
use crate::spatial::VertexTree;

/// One full alignment run over a prepared pair of sets.
pub(crate) struct Engine<'a> {
    set1: &'a PointSet,
    set2: &'a PointSet,
    xf1: Matrix4<f64>,
    xf2: &'a mut Matrix4<f64>,
    tree1: &'a VertexTree,
    tree2: &'a VertexTree,
    grid1: &'a OccupancyGrid,
    grid2: &'a OccupancyGrid,
    weights1: &'a mut Vec<f64>,
    weights2: &'a mut Vec<f64>,
    weights_synthesized: bool,
    cfg: &'a AlignConfig,
    rng: StdRng,

    // Iteration state
    max_dist: f64,
    dist_floor: f64,
    norm_dot_thresh: f64,
    cdf_incr: f64,
    cdf1: Cdf,
    cdf2: Cdf,
    pairs: Vec<PointPair>,
}

impl<'a> Engine<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        set1: &'a PointSet,
        set2: &'a PointSet,
        xf1: &Matrix4<f64>,
        xf2: &'a mut Matrix4<f64>,
        tree1: &'a VertexTree,
        tree2: &'a VertexTree,
        grid1: &'a OccupancyGrid,
        grid2: &'a OccupancyGrid,
        weights1: &'a mut Vec<f64>,
        weights2: &'a mut Vec<f64>,
        weights_synthesized: bool,
        max_dist: f64,
        cfg: &'a AlignConfig,
    ) -> AlignResult<Self> {
        let max_dist = if max_dist <= 0.0 {
            grid1.bbox_size().min(grid2.bbox_size())
        } else {
            max_dist
        };

        let cdf1 = Cdf::from_weights(weights1).ok_or(AlignError::NoOverlap)?;
        let cdf2 = Cdf::from_weights(weights2).ok_or(AlignError::NoOverlap)?;

        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            set1,
            set2,
            xf1: *xf1,
            xf2,
            tree1,
            tree2,
            grid1,
            grid2,
            weights1,
            weights2,
            weights_synthesized,
            cfg,
            rng,
            max_dist,
            // Exactly coincident sets drive the median distance to zero;
            // keep the cutoff above float jitter so matching never starves.
            dist_floor: max_dist * 1e-12,
            norm_dot_thresh: 0.5,
            cdf_incr: 2.0 / cfg.desired_pairs as f64,
            cdf1,
            cdf2,
            pairs: Vec::new(),
        })
    }

    /// Run the full schedule; returns the RMS residual of the last iteration.
    pub fn run(mut self) -> AlignResult<f64> {
        let cfg = self.cfg;

        // Initial iteration stabilizes thresholds before the main loop.
        let initial_xform = match cfg.xform_type {
            XformType::Translation => XformType::Translation,
            _ => XformType::Rigid,
        };
        self.iterate(initial_xform, false, cfg.desired_pairs)?;

        let mut iter_xform = initial_xform;
        let mut min_err = f64::INFINITY;
        let mut iters_since_min = 0u32;

        for iter in 0..cfg.max_iters {
            // Scale and affine solves switch on only once the rigid part has
            // had time to settle.
            if iter == cfg.max_iters / 2
                && matches!(cfg.xform_type, XformType::Similarity | XformType::Affine)
            {
                iter_xform = cfg.xform_type;
            }

            let recompute = iter % cfg.cdf_update_interval == 0;
            if recompute {
                if iter != 0 && self.weights_synthesized {
                    self.refresh_overlap_weights();
                }
                self.rebuild_weight_cdfs()?;
            }

            let err = self.iterate(iter_xform, recompute, cfg.desired_pairs)?;

            // Recompute iterations sample from the plain weight distribution
            // rather than the importance one; their error estimates are
            // biased differently and stay out of the minimum tracking.
            if !recompute {
                if err < min_err {
                    min_err = err;
                    iters_since_min = 0;
                } else {
                    iters_since_min += 1;
                }
                if iters_since_min >= cfg.termination_iter_thresh
                    && matches!(cfg.xform_type, XformType::Translation | XformType::Rigid)
                {
                    log::debug!("converged after {} iterations (err {:.3e})", iter + 1, err);
                    break;
                }
            }
        }

        // Final refinement at the higher sampling rate.
        self.cdf_incr *= cfg.desired_pairs as f64 / cfg.desired_pairs_final as f64;
        self.rebuild_weight_cdfs()?;
        let mut final_err = 0.0;
        for _ in 0..cfg.final_iters {
            final_err = self.iterate(iter_xform, false, cfg.desired_pairs_final)?;
        }
        Ok(final_err)
    }

    /// One matching + rejection + solve pass; returns its RMS residual.
    fn iterate(
        &mut self,
        iter_xform: XformType,
        update_cdfs: bool,
        desired_pairs: usize,
    ) -> AlignResult<f64> {
        let cfg = self.cfg;
        let params = MatchParams {
            cdf_incr: self.cdf_incr,
            max_dist: self.max_dist,
            norm_dot_thresh: self.norm_dot_thresh,
            use_norm_compat: cfg.use_norm_compat,
            reject_boundary: cfg.reject_boundary,
        };

        self.pairs.clear();
        select_and_match(
            self.set1,
            self.set2,
            &self.xf1,
            self.xf2,
            self.tree2,
            &self.cdf1,
            &params,
            false,
            &mut self.rng,
            &mut self.pairs,
        );
        select_and_match(
            self.set2,
            self.set1,
            self.xf2,
            &self.xf1,
            self.tree1,
            &self.cdf2,
            &params,
            true,
            &mut self.rng,
            &mut self.pairs,
        );

        if self.pairs.len() < cfg.min_pairs {
            return Err(AlignError::InsufficientPairs {
                found: self.pairs.len(),
                required: cfg.min_pairs,
            });
        }

        let mut stats = PairStats::compute(&self.pairs, cfg);
        stats.max_dist = stats.max_dist.max(self.dist_floor);
        log::trace!(
            "medians: dist {:.4e} normdot {:.4}",
            stats.med_dist,
            stats.med_norm_dot
        );
        stats.prune(&mut self.pairs);
        self.max_dist = stats.max_dist;
        self.norm_dot_thresh = stats.norm_dot_thresh;

        if self.pairs.len() < cfg.min_pairs {
            return Err(AlignError::InsufficientPairs {
                found: self.pairs.len(),
                required: cfg.min_pairs,
            });
        }
        self.cdf_incr *= self.pairs.len() as f64 / desired_pairs as f64;

        let (c1, c2) = centroids(&self.pairs);
        let scale = rms_scale(&self.pairs, &c1, &c2);

        let mut solve: Option<RigidSolve> = None;
        let alignxf = match iter_xform {
            XformType::Translation => {
                align_translation(&self.pairs, &c1, &c2, cfg.regularization)
            }
            _ => {
                let rigid = align_symmetric(&self.pairs, scale, &c1, &c2, cfg.regularization);
                let alignxf = match iter_xform {
                    XformType::Similarity => {
                        apply_scale(&rigid.alignxf, &self.pairs, &c1, &c2, false)
                    }
                    XformType::Affine => apply_scale(&rigid.alignxf, &self.pairs, &c1, &c2, true),
                    _ => rigid.alignxf,
                };
                solve = Some(rigid);
                alignxf
            }
        };

        *self.xf2 = alignxf * *self.xf2;
        if cfg.xform_type == XformType::Rigid {
            *self.xf2 = orthogonalize(self.xf2);
        }

        if update_cdfs {
            self.update_sample_cdfs(solve.as_ref(), &c1, &c2, scale)?;
        }

        let err = self.rms_error(&alignxf);
        log::debug!(
            "pairs {:>5}  maxdist {:.4}  normdot {:.3}  err {:.3e}",
            self.pairs.len(),
            self.max_dist,
            self.norm_dot_thresh,
            err
        );
        Ok(err)
    }

    /// RMS distance of the pruned pairs after applying the increment.
    fn rms_error(&self, alignxf: &Matrix4<f64>) -> f64 {
        let sum: f64 = self
            .pairs
            .iter()
            .map(|pr| (alignxf.transform_point(&pr.p2) - pr.p1).norm_squared())
            .sum();
        (sum / self.pairs.len() as f64).sqrt()
    }

    /// Refresh synthesized weights from the overlap indicators.
    fn refresh_overlap_weights(&mut self) {
        let (o1, o2) = compute_overlaps(
            self.set1,
            self.set2,
            &self.xf1,
            self.xf2,
            self.tree1,
            self.tree2,
            self.grid1,
            self.grid2,
            self.max_dist,
        );
        *self.weights1 = o1;
        *self.weights2 = o2;
    }

    /// Rebuild both CDFs proportional to the plain per-vertex weights.
    fn rebuild_weight_cdfs(&mut self) -> AlignResult<()> {
        self.cdf1 = Cdf::from_weights(self.weights1).ok_or(AlignError::NoOverlap)?;
        self.cdf2 = Cdf::from_weights(self.weights2).ok_or(AlignError::NoOverlap)?;
        Ok(())
    }

    /// Install importance-driven CDFs from the most recent rigid solve.
    ///
    /// Translation-only runs never produce an eigendecomposition; they keep
    /// the plain weight distribution instead.
    fn update_sample_cdfs(
        &mut self,
        solve: Option<&RigidSolve>,
        c1: &nalgebra::Point3<f64>,
        c2: &nalgebra::Point3<f64>,
        scale: f64,
    ) -> AlignResult<()> {
        let Some(solve) = solve else {
            return self.rebuild_weight_cdfs();
        };
        self.cdf1 = importance_cdf(
            self.set1,
            &self.xf1,
            c1,
            scale,
            &solve.evec,
            &solve.einv,
            self.weights1,
        )
        .ok_or(AlignError::NoOverlap)?;
        self.cdf2 = importance_cdf(
            self.set2,
            self.xf2,
            c2,
            scale,
            &solve.evec,
            &solve.einv,
            self.weights2,
        )
        .ok_or(AlignError::NoOverlap)?;
        Ok(())
    }
}
