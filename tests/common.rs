//! Shared fixtures for alignment tests.

use bindu_align::PointSet;
use bindu_align::math::normal_xf;
use nalgebra::{Matrix4, Point3, Vector3};
use rand::Rng;
use rand::rngs::StdRng;

/// Golden-angle increment for even sphere coverage.
const GOLDEN_ANGLE: f64 = 2.399963229728653;

/// Evenly distributed points on a sphere with exact outward normals.
pub fn sphere_set(n: usize, radius: f64) -> PointSet {
    let positions: Vec<Point3<f64>> = (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let phi = GOLDEN_ANGLE * i as f64;
            Point3::new(
                radius * r * phi.cos(),
                radius * r * phi.sin(),
                radius * z,
            )
        })
        .collect();
    let normals = positions.iter().map(|p| p.coords.normalize()).collect();
    PointSet::with_normals(positions, normals)
}

/// The eight corners of the unit cube with outward diagonal normals.
pub fn cube_corner_set() -> PointSet {
    let mut positions = Vec::with_capacity(8);
    let mut normals = Vec::with_capacity(8);
    for ix in 0..2 {
        for iy in 0..2 {
            for iz in 0..2 {
                positions.push(Point3::new(ix as f64, iy as f64, iz as f64));
                normals.push(
                    Vector3::new(ix as f64 - 0.5, iy as f64 - 0.5, iz as f64 - 0.5).normalize(),
                );
            }
        }
    }
    PointSet::with_normals(positions, normals)
}

/// Copy of a set with positions and normals mapped through a transform.
pub fn transformed_set(set: &PointSet, xf: &Matrix4<f64>) -> PointSet {
    let nxf = normal_xf(xf);
    let positions = set.positions.iter().map(|p| xf.transform_point(p)).collect();
    let normals = set.normals.iter().map(|n| (nxf * n).normalize()).collect();
    PointSet {
        positions,
        normals,
        boundary: set.boundary.clone(),
        is_point_cloud: set.is_point_cloud,
    }
}

/// Standard normal deviate (Box-Muller).
pub fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Rotation angle of a transform's 3x3 block, in radians.
pub fn rotation_angle(xf: &Matrix4<f64>) -> f64 {
    let r = xf.fixed_view::<3, 3>(0, 0);
    (((r.trace() - 1.0) / 2.0).clamp(-1.0, 1.0)).acos()
}

/// Translation component of a transform.
pub fn translation_of(xf: &Matrix4<f64>) -> Vector3<f64> {
    Vector3::new(xf[(0, 3)], xf[(1, 3)], xf[(2, 3)])
}
