//! Incremental transform solvers.
//!
//! The rigid path linearizes the symmetric point-to-plane objective: residuals
//! use the average of the two pair normals and both points move half-way,
//! which keeps the two sets in reciprocal roles and converges in fewer
//! iterations than the one-sided formulation. Point-to-point rows at a small
//! weight regularize the system, and a Huber-style IRLS weight per pair tames
//! large plane residuals.
//!
//! Scale and affine refinements are solved post-hoc on top of the rigid
//! increment from the covariances of the paired points.

use nalgebra::{Matrix3, Matrix4, Matrix6, Point3, SymmetricEigen, Vector3, Vector6};

use crate::core::math::{eigmult, rotation_about, symmetric_power};
use crate::core::types::PointPair;

/// Result of a rigid solve; the eigendecomposition is kept for the
/// importance reweighter.
#[derive(Debug, Clone)]
pub(crate) struct RigidSolve {
    /// Incremental world-space transform to compose onto xf2.
    pub alignxf: Matrix4<f64>,
    /// Eigenvectors of the 6x6 system matrix.
    pub evec: Matrix6<f64>,
    /// Inverted eigenvalues of the 6x6 system matrix.
    pub einv: Vector6<f64>,
}

/// Centroids of the two sides of a pair list.
pub(crate) fn centroids(pairs: &[PointPair]) -> (Point3<f64>, Point3<f64>) {
    let n = pairs.len() as f64;
    let mut c1 = Vector3::zeros();
    let mut c2 = Vector3::zeros();
    for p in pairs {
        c1 += p.p1.coords;
        c2 += p.p2.coords;
    }
    (Point3::from(c1 / n), Point3::from(c2 / n))
}

/// Reciprocal RMS distance of the paired points to their centroids.
///
/// Conditions the 6x6 system by normalizing the cloud to unit spread.
pub(crate) fn rms_scale(pairs: &[PointPair], c1: &Point3<f64>, c2: &Point3<f64>) -> f64 {
    let mut sum = 0.0;
    for p in pairs {
        sum += (p.p1 - c1).norm_squared() + (p.p2 - c2).norm_squared();
    }
    let rms = (sum / (2.0 * pairs.len() as f64)).sqrt();
    1.0 / rms.max(1e-300)
}

/// Accumulate the symmetric point-to-plane normal equations.
fn accumulate(
    pairs: &[PointPair],
    scale: f64,
    c1: &Point3<f64>,
    c2: &Point3<f64>,
    regularization: f64,
) -> (Matrix6<f64>, Vector6<f64>) {
    let mut a = Matrix6::zeros();
    let mut b = Vector6::zeros();

    for pr in pairs {
        let p1 = (pr.p1 - c1) * scale;
        let p2 = (pr.p2 - c2) * scale;
        let n = 0.5 * (pr.n1 + pr.n2);
        let p = p1 + p2;
        let d = p1 - p2;
        let c = p.cross(&n);
        let dn = d.dot(&n);

        // L1-like behavior beyond the knee: weight ~ 1/|dn|.
        let w = regularization / dn.abs().max(regularization);

        let x_n = Vector6::new(c.x, c.y, c.z, n.x, n.y, n.z);
        a += (x_n * x_n.transpose()) * w;
        b += x_n * (w * dn);

        // Point-to-point rows pin the translational null space of
        // one-directional normals.
        let x_x = Vector6::new(0.0, p.z, -p.y, 1.0, 0.0, 0.0);
        let x_y = Vector6::new(-p.z, 0.0, p.x, 0.0, 1.0, 0.0);
        let x_z = Vector6::new(p.y, -p.x, 0.0, 0.0, 0.0, 1.0);
        let wr = w * regularization;
        a += (x_x * x_x.transpose() + x_y * x_y.transpose() + x_z * x_z.transpose()) * wr;
        b += (x_x * d.x + x_y * d.y + x_z * d.z) * wr;
    }

    // Outer products are symmetric up to rounding; make it exact.
    a = (a + a.transpose()) * 0.5;
    (a, b)
}

/// Solve the 6-DoF symmetric point-to-plane system for the pair list.
///
/// The solution vector holds a half-angle rotation triple and a translation;
/// the returned transform sandwiches the translation between two applications
/// of the rotation, centered between the two centroids:
/// `T(c1) * R * T(trans) * R * T(-c2)`.
pub(crate) fn align_symmetric(
    pairs: &[PointPair],
    scale: f64,
    c1: &Point3<f64>,
    c2: &Point3<f64>,
    regularization: f64,
) -> RigidSolve {
    let (a, b) = accumulate(pairs, scale, c1, c2, regularization);

    let eigen = SymmetricEigen::new(a);
    let evec = eigen.eigenvectors;
    let mut einv = Vector6::zeros();
    for j in 0..6 {
        let l = eigen.eigenvalues[j];
        einv[j] = if l.abs() > 1e-300 { 1.0 / l } else { 0.0 };
    }

    let x = eigmult(&evec, &einv, &b);
    let rotvec = Vector3::new(x[0], x[1], x[2]);
    let rotangle = rotvec.norm().atan();
    let trans = Vector3::new(x[3], x[4], x[5]) * (rotangle.cos() / scale);

    let r = rotation_about(&rotvec, rotangle);
    let alignxf = Matrix4::new_translation(&c1.coords)
        * r
        * Matrix4::new_translation(&trans)
        * r
        * Matrix4::new_translation(&(-c2.coords));

    RigidSolve { alignxf, evec, einv }
}

/// Solve the 3-DoF translation-only variant.
pub(crate) fn align_translation(
    pairs: &[PointPair],
    c1: &Point3<f64>,
    c2: &Point3<f64>,
    regularization: f64,
) -> Matrix4<f64> {
    let mut a = Matrix3::zeros();
    let mut b = Vector3::zeros();
    for pr in pairs {
        let d = (pr.p1 - c1) - (pr.p2 - c2);
        let n = 0.5 * (pr.n1 + pr.n2);
        a += n * n.transpose();
        b += n * d.dot(&n);
    }
    a += Matrix3::identity() * (regularization * pairs.len() as f64);

    let t = a
        .try_inverse()
        .map(|inv| inv * b)
        .unwrap_or_else(Vector3::zeros);
    Matrix4::new_translation(&(t + (c1 - c2)))
}

/// Compose a post-hoc scale (uniform) or affine correction onto a rigid
/// increment.
///
/// Compares the covariances of the two point clouds about their common
/// centroid after the rigid increment. Uniform mode scales by the square root
/// of the eigenvalue-sum ratio; affine mode maps the second cloud's
/// covariance onto the first via `cov1^(1/2) * cov2^(-1/2)`, reconstructed
/// from eigendecompositions with eigenvalues clamped to a positive floor.
pub(crate) fn apply_scale(
    alignxf: &Matrix4<f64>,
    pairs: &[PointPair],
    c1: &Point3<f64>,
    c2: &Point3<f64>,
    affine: bool,
) -> Matrix4<f64> {
    let centroid = 0.5 * (c1.coords + alignxf.transform_point(c2).coords);

    let mut cov1 = Matrix3::zeros();
    let mut cov2 = Matrix3::zeros();
    for pr in pairs {
        let d1 = pr.p1.coords - centroid;
        cov1 += d1 * d1.transpose();
        let d2 = alignxf.transform_point(&pr.p2).coords - centroid;
        cov2 += d2 * d2.transpose();
    }

    let correction = if affine {
        let floor1 = 1e-12 * cov1.trace().max(1e-300);
        let floor2 = 1e-12 * cov2.trace().max(1e-300);
        let m = symmetric_power(&cov1, 0.5, floor1) * symmetric_power(&cov2, -0.5, floor2);
        m.to_homogeneous()
    } else {
        let sum1 = cov1.trace();
        let sum2 = cov2.trace();
        if sum1 <= 0.0 || sum2 <= 0.0 {
            return *alignxf;
        }
        Matrix4::new_scaling((sum1 / sum2).sqrt())
    };

    Matrix4::new_translation(&centroid) * correction * Matrix4::new_translation(&(-centroid))
        * alignxf
}
