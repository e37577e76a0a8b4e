//! Importance reweighting of the sampling distributions.
//!
//! After a solve, each vertex is scored by how much it would constrain the
//! directions the current 6x6 system resolves poorly: the vertex's
//! rotation/translation row is projected onto the system's eigenvectors and
//! weighted by the square root of the inverted eigenvalues. The square root
//! is a compromise between uniform sampling (eigenvalues ignored) and full
//! eigenvalue-directed sampling, which degenerates when one direction is
//! nearly singular.

use nalgebra::{Matrix4, Matrix6, Point3, Vector6};
use rayon::prelude::*;

use crate::core::math::normal_xf;
use crate::core::types::PointSet;
use crate::sampling::Cdf;

/// Build the next-iteration sampling CDF for one set.
///
/// `centroid` and `scale` are the conditioning values of the solve the
/// eigenstructure came from; the factor 2 on the position matches the
/// `p = p1 + p2` convention of the accumulator, so a single-set estimate is
/// consistent with the joint system. Returns `None` when every score-weight
/// product is zero, which the controller reports as lost overlap.
pub(crate) fn importance_cdf(
    set: &PointSet,
    xf: &Matrix4<f64>,
    centroid: &Point3<f64>,
    scale: f64,
    evec: &Matrix6<f64>,
    einv: &Vector6<f64>,
    weights: &[f64],
) -> Option<Cdf> {
    let nxf = normal_xf(xf);
    let sqrt_einv = einv.map(|v| v.max(0.0).sqrt());

    let scores: Vec<f64> = (0..set.len())
        .into_par_iter()
        .map(|i| {
            let p = (xf.transform_point(&set.position(i)) - centroid) * (2.0 * scale);
            let n = nxf * set.normal(i);
            let c = p.cross(&n);
            let row = Vector6::new(c.x, c.y, c.z, n.x, n.y, n.z);

            let mut s = 0.0;
            for j in 0..6 {
                let proj = evec.column(j).dot(&row);
                s += sqrt_einv[j] * proj * proj;
            }
            s * weights[i]
        })
        .collect();

    Cdf::from_weights(&scores)
}
