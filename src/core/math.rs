//! Math primitives for rigid and affine 4x4 transforms.
//!
//! Thin helpers over `nalgebra` for the operations the alignment engine needs
//! beyond what the library provides directly: normal transforms, rotation
//! re-orthogonalization, eigenbasis solves and symmetric matrix powers.

use nalgebra::{Matrix3, Matrix4, Matrix6, Rotation3, SymmetricEigen, Unit, Vector3, Vector6};

/// Extract the 3x3 rotational/linear block of a 4x4 affine transform.
#[inline]
pub fn rotation_block(xf: &Matrix4<f64>) -> Matrix3<f64> {
    xf.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Derive the normal transform of an affine map: the inverse-transpose of its
/// 3x3 linear block.
///
/// For pure rotations this equals the block itself; for scaled or sheared
/// maps it is what keeps transformed normals perpendicular to transformed
/// surfaces. Falls back to the plain block when the map is singular.
pub fn normal_xf(xf: &Matrix4<f64>) -> Matrix3<f64> {
    let linear = rotation_block(xf);
    match linear.try_inverse() {
        Some(inv) => inv.transpose(),
        None => linear,
    }
}

/// Rotation about an axis by an angle, as a 4x4 transform.
///
/// A degenerate axis yields the identity.
pub fn rotation_about(axis: &Vector3<f64>, angle: f64) -> Matrix4<f64> {
    match Unit::try_new(*axis, 1e-300) {
        Some(unit) => Rotation3::from_axis_angle(&unit, angle).to_homogeneous(),
        None => Matrix4::identity(),
    }
}

/// Re-orthogonalize the rotational block of a transform, keeping translation.
///
/// Projects the 3x3 block onto the nearest proper rotation (SVD, determinant
/// forced positive). Repeated 4x4 composition drifts the block away from
/// orthogonality; this removes the drift.
pub fn orthogonalize(xf: &Matrix4<f64>) -> Matrix4<f64> {
    let svd = rotation_block(xf).svd(true, true);
    let (Some(mut u), Some(v_t)) = (svd.u, svd.v_t) else {
        return *xf;
    };
    if (u * v_t).determinant() < 0.0 {
        // Reflection: flip the singular direction with the smallest value.
        u.column_mut(2).neg_mut();
    }
    let rot = u * v_t;

    let mut out = *xf;
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&rot);
    out
}

/// Solve `A x = b` for a symmetric `A` given its eigendecomposition.
///
/// Rotates `b` into the eigenbasis, scales by the inverted eigenvalues and
/// rotates back: `x = V diag(einv) V^T b`.
#[inline]
pub fn eigmult(evec: &Matrix6<f64>, einv: &Vector6<f64>, b: &Vector6<f64>) -> Vector6<f64> {
    let proj = evec.transpose() * b;
    evec * proj.component_mul(einv)
}

/// Symmetric matrix power via eigen-reconstruction: `V diag(l^exp) V^T`.
///
/// Eigenvalues are clamped to `floor` before exponentiation so that
/// near-singular covariances stay invertible for negative exponents.
pub fn symmetric_power(m: &Matrix3<f64>, exponent: f64, floor: f64) -> Matrix3<f64> {
    let eigen = SymmetricEigen::new(*m);
    let mut diag = Matrix3::zeros();
    for i in 0..3 {
        diag[(i, i)] = eigen.eigenvalues[i].max(floor).powf(exponent);
    }
    eigen.eigenvectors * diag * eigen.eigenvectors.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_3;

    #[test]
    fn test_normal_xf_of_rotation_is_rotation() {
        let xf = rotation_about(&Vector3::new(1.0, 2.0, -0.5), FRAC_PI_3);
        let nxf = normal_xf(&xf);
        let rot = rotation_block(&xf);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(nxf[(i, j)], rot[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_normal_xf_undoes_scale() {
        // A scaled surface keeps its normals unit-perpendicular only under
        // the inverse-transpose map.
        let xf = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let nxf = normal_xf(&xf);
        let n = nxf * Vector3::x();
        assert_relative_eq!(n.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_orthogonalize_restores_rotation() {
        let mut xf = rotation_about(&Vector3::z(), 0.7);
        xf[(0, 0)] += 1e-3; // inject drift
        let fixed = orthogonalize(&xf);
        let rot = rotation_block(&fixed);
        let should_be_identity = rot * rot.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(should_be_identity[(i, j)], expect, epsilon = 1e-9);
            }
        }
        assert_relative_eq!(rot.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_orthogonalize_keeps_translation() {
        let mut xf = Matrix4::new_translation(&Vector3::new(1.0, -2.0, 3.0));
        xf[(1, 1)] = 1.0 + 1e-4;
        let fixed = orthogonalize(&xf);
        assert_relative_eq!(fixed[(0, 3)], 1.0);
        assert_relative_eq!(fixed[(1, 3)], -2.0);
        assert_relative_eq!(fixed[(2, 3)], 3.0);
    }

    #[test]
    fn test_eigmult_solves_diagonal_system() {
        let evec = Matrix6::identity();
        let einv = Vector6::new(1.0, 0.5, 0.25, 1.0, 1.0, 1.0);
        let b = Vector6::new(1.0, 2.0, 4.0, 0.0, 0.0, 0.0);
        let x = eigmult(&evec, &einv, &b);
        assert_relative_eq!(x[0], 1.0);
        assert_relative_eq!(x[1], 1.0);
        assert_relative_eq!(x[2], 1.0);
    }

    #[test]
    fn test_symmetric_power_sqrt() {
        let m = Matrix3::from_diagonal(&Vector3::new(4.0, 9.0, 16.0));
        let root = symmetric_power(&m, 0.5, 1e-12);
        assert_relative_eq!(root[(0, 0)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(root[(1, 1)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(root[(2, 2)], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_power_inverse_sqrt_clamps() {
        let m = Matrix3::from_diagonal(&Vector3::new(4.0, 0.0, 1.0));
        let inv_root = symmetric_power(&m, -0.5, 1e-6);
        assert_relative_eq!(inv_root[(0, 0)], 0.5, epsilon = 1e-12);
        assert!(inv_root[(1, 1)].is_finite());
    }

    #[test]
    fn test_rotation_about_degenerate_axis() {
        let xf = rotation_about(&Vector3::zeros(), 1.0);
        assert_relative_eq!(xf[(0, 0)], 1.0);
        assert_relative_eq!(xf[(1, 0)], 0.0);
    }
}
