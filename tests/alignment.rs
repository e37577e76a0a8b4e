//! End-to-end alignment scenarios.

mod common;

use approx::assert_relative_eq;
use bindu_align::math::rotation_block;
use bindu_align::{AlignConfig, AlignError, PointSet, XformType, align, evaluate};
use common::{
    cube_corner_set, gaussian, rotation_angle, sphere_set, transformed_set, translation_of,
};
use nalgebra::{Matrix4, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn seeded_config(xform_type: XformType) -> AlignConfig {
    AlignConfig {
        xform_type,
        seed: Some(42),
        ..AlignConfig::default()
    }
}

#[test]
fn test_identity_convergence() {
    let set = sphere_set(500, 1.0);
    let mut xf2 = Matrix4::identity();

    let rms = align(
        &set,
        &set,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    )
    .expect("identity alignment must succeed");

    assert!(rms <= 1e-4 * set.bbox_diagonal(), "rms {rms} too large");
    assert!(translation_of(&xf2).norm() < 1e-6);
    assert!(rotation_angle(&xf2) < 1e-6);
}

#[test]
fn test_translation_recovery_cube_corners() {
    let set1 = cube_corner_set();
    let offset = Vector3::new(0.1, 0.0, 0.0);
    let set2 = transformed_set(&set1, &Matrix4::new_translation(&offset));
    let mut xf2 = Matrix4::identity();

    let rms = align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    )
    .expect("translation alignment must succeed");

    assert!(rms <= 1e-4);
    let t = translation_of(&xf2);
    assert_relative_eq!(t.x, -0.1, epsilon = 1e-4);
    assert_relative_eq!(t.y, 0.0, epsilon = 1e-4);
    assert_relative_eq!(t.z, 0.0, epsilon = 1e-4);
    assert!(rotation_angle(&xf2) < 1e-4);
}

#[test]
fn test_small_rotation_recovery() {
    let set1 = sphere_set(1000, 1.0);
    let angle = 5.0_f64.to_radians();
    let rot = bindu_align::math::rotation_about(&Vector3::z(), angle);
    let set2 = transformed_set(&set1, &rot);
    let mut xf2 = Matrix4::identity();

    align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    )
    .expect("rotation alignment must succeed");

    // xf2 composed with the applied rotation should cancel to identity.
    let residual = xf2 * rot;
    assert!(
        rotation_angle(&residual) < 0.05_f64.to_radians(),
        "rotation error {} rad",
        rotation_angle(&residual)
    );
    assert!(translation_of(&residual).norm() < 1e-3);
}

#[test]
fn test_similarity_recovers_scale() {
    let set1 = sphere_set(1000, 1.0);
    let xf = Matrix4::new_translation(&Vector3::new(0.05, -0.02, 0.0))
        * Matrix4::new_scaling(1.1);
    let set2 = transformed_set(&set1, &xf);
    let mut xf2 = Matrix4::identity();

    align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Similarity),
    )
    .expect("similarity alignment must succeed");

    // xf2 must undo the 1.1 scaling: its linear block carries 1/1.1.
    let recovered = 1.0 / rotation_block(&xf2).determinant().cbrt();
    assert_relative_eq!(recovered, 1.1, epsilon = 0.005 * 1.1);
}

#[test]
fn test_noise_robustness() {
    let set1 = sphere_set(1000, 1.0);
    let sigma = 0.01 * 2.0; // 1% of the bbox extent
    let mut rng = StdRng::seed_from_u64(7);

    // Noisy copy plus 5% outliers scattered in the bounding box.
    let mut set2 = set1.clone();
    for p in &mut set2.positions {
        p.x += sigma * gaussian(&mut rng);
        p.y += sigma * gaussian(&mut rng);
        p.z += sigma * gaussian(&mut rng);
    }
    for _ in 0..50 {
        set2.positions.push(Point3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        ));
        let n = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        set2.normals.push(n.normalize());
    }

    let mut xf2 = Matrix4::identity();
    let rms = align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    )
    .expect("noisy alignment must succeed");

    assert!(rms <= 2.0 * sigma, "rms {rms} above 2 sigma");
    // The recovered motion stays near identity.
    assert!(translation_of(&xf2).norm() < 0.02);
    assert!(rotation_angle(&xf2) < 0.02);
}

#[test]
fn test_no_overlap_fails() {
    let set1 = sphere_set(300, 1.0);
    let offset = 10.0 * set1.bbox_diagonal();
    let set2 = transformed_set(
        &set1,
        &Matrix4::new_translation(&Vector3::new(offset, 0.0, 0.0)),
    );
    let mut xf2 = Matrix4::identity();

    let result = align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    );
    assert!(result.is_err());
}

#[test]
fn test_empty_set_fails() {
    let set = sphere_set(100, 1.0);
    let empty = PointSet::new(Vec::new());
    let mut xf2 = Matrix4::identity();

    let result = align(
        &set,
        &empty,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    );
    assert_eq!(result, Err(AlignError::EmptyPointSet));
}

#[test]
fn test_point_cloud_mode_converges_on_translation() {
    // Estimated normals, no reliable orientation: the matcher must run
    // without the normal gate and still recover a translational offset.
    let mut set1 = sphere_set(800, 1.0);
    set1.normals.clear();
    set1.ensure_normals(12);
    assert!(set1.is_point_cloud);

    let offset = Vector3::new(0.05, 0.0, 0.0);
    let set2 = transformed_set(&set1, &Matrix4::new_translation(&offset));
    let mut xf2 = Matrix4::identity();

    let rms = align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    )
    .expect("point-cloud alignment must succeed");

    let t = translation_of(&xf2);
    assert_relative_eq!(t.x, -0.05, epsilon = 0.01);
    assert!(t.y.abs() < 0.01);
    assert!(t.z.abs() < 0.01);
    assert!(rms < 0.01);
}

#[test]
fn test_swap_invariance() {
    let set1 = sphere_set(600, 1.0);
    let xf = bindu_align::math::rotation_about(&Vector3::y(), 3.0_f64.to_radians())
        * Matrix4::new_translation(&Vector3::new(0.04, 0.0, -0.02));
    let set2 = transformed_set(&set1, &xf);

    let mut xf2_fwd = Matrix4::identity();
    align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2_fwd,
        &seeded_config(XformType::Rigid),
    )
    .expect("forward alignment must succeed");

    let mut xf2_rev = Matrix4::identity();
    align(
        &set2,
        &set1,
        &Matrix4::identity(),
        &mut xf2_rev,
        &seeded_config(XformType::Rigid),
    )
    .expect("reverse alignment must succeed");

    let composed = xf2_fwd * xf2_rev;
    assert!(rotation_angle(&composed) < 1e-3);
    assert!(translation_of(&composed).norm() < 1e-3);
}

#[test]
fn test_translation_only_mode() {
    let set1 = sphere_set(500, 1.0);
    let offset = Vector3::new(0.08, -0.03, 0.05);
    let set2 = transformed_set(&set1, &Matrix4::new_translation(&offset));
    let mut xf2 = Matrix4::identity();

    align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Translation),
    )
    .expect("translation-only alignment must succeed");

    let t = translation_of(&xf2);
    assert_relative_eq!(t.x, -offset.x, epsilon = 1e-3);
    assert_relative_eq!(t.y, -offset.y, epsilon = 1e-3);
    assert_relative_eq!(t.z, -offset.z, epsilon = 1e-3);
    // Translation-only never touches the rotational block.
    assert!(rotation_angle(&xf2) < 1e-12);
}

#[test]
fn test_evaluate_agrees_with_alignment() {
    let set1 = sphere_set(500, 1.0);
    let set2 = transformed_set(
        &set1,
        &Matrix4::new_translation(&Vector3::new(0.05, 0.0, 0.0)),
    );
    let mut xf2 = Matrix4::identity();

    align(
        &set1,
        &set2,
        &Matrix4::identity(),
        &mut xf2,
        &seeded_config(XformType::Rigid),
    )
    .expect("alignment must succeed");

    let rms = evaluate(&set1, &set2, &Matrix4::identity(), &xf2, 0.5)
        .expect("aligned sets must have matches");
    assert!(rms < 1e-4);
}
