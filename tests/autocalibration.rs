mod common;

use nalgebra as na;
use approx::assert_relative_eq;

use na::{Matrix3, Matrix3x4, Matrix4, Vector3};
use vision_geometry::{Float, GeometryConfig, GeometryError};
use vision_geometry::numerics::pose::{decomp, rotation_angle_between};
use vision_geometry::sensors::camera::Camera;
use vision_geometry::sensors::camera::perspective::Perspective;
use vision_geometry::sfm::autocalibration::{
    calibrate_from_projection_matrices_3_views_if, calibrate_from_projection_matrices_if,
    determine_absolute_dual_quadric_linear_if, find_common_intrinsics_from_projection_matrices_if,
    find_common_intrinsics_from_projection_matrices_unconstrained_if, intrinsics_from_absolute_dual_quadric_if};
use vision_geometry::sfm::synthetic::{random_poses_if, SyntheticScene};
use vision_geometry::sfm::projective::projective_reconstruction_from_6_points_if;

/**
 * Projections P_i * G scaled by arbitrary factors, i.e. the same cameras in an unknown projective frame.
 */
#[allow(non_snake_case)]
fn scramble(projections: &[Matrix3x4<Float>]) -> Vec<Matrix3x4<Float>> {
    let G = Matrix4::<Float>::new(
        1.0, 0.2, -0.1, 0.3,
        0.1, 0.9, 0.2, -0.2,
        -0.3, 0.1, 1.1, 0.5,
        0.05, -0.02, 0.1, 1.0);
    let scales = [0.002, -0.003, 0.0015, -0.001, 0.0025];
    projections.iter().zip(scales.iter().cycle()).map(|(P, s)| P*G*(*s)).collect()
}

fn assert_intrinsics_close(estimated: &Matrix3<Float>, expected: &Matrix3<Float>, relative: Float) {
    for (r, c) in [(0, 0), (1, 1), (0, 2), (1, 2)].iter() {
        let expected_value = expected[(*r, *c)];
        assert!((estimated[(*r, *c)] - expected_value).abs() <= relative*expected_value.abs(),
            "K({},{}) = {} but expected {}", r, c, estimated[(*r, *c)], expected_value);
    }
    assert!(estimated[(0, 1)].abs() <= relative*expected[(0, 0)]);
    assert_relative_eq!(estimated[(2, 2)], 1.0, epsilon = 1e-12);
}

fn camera_center(pose_if: &Matrix4<Float>) -> Vector3<Float> {
    let (t, rotation) = decomp(pose_if);
    -rotation.transpose()*t
}

/**
 * Compares relative rotations and the ratios of camera center distances, both invariant under similarities.
 */
fn assert_poses_up_to_similarity(estimated: &[Matrix4<Float>], expected: &[Matrix4<Float>]) {
    let (_, rotation_0) = decomp(&estimated[0]);
    let (_, rotation_0_gt) = decomp(&expected[0]);
    for (pose, pose_gt) in estimated.iter().zip(expected.iter()).skip(1) {
        let (_, rotation) = decomp(pose);
        let (_, rotation_gt) = decomp(pose_gt);
        assert!(rotation_angle_between(&(rotation*rotation_0.transpose()), &(rotation_gt*rotation_0_gt.transpose())) < 1e-3);
    }

    let distance = |poses: &[Matrix4<Float>], i: usize| (camera_center(&poses[i]) - camera_center(&poses[0])).norm();
    let ratio = distance(estimated, 2)/distance(estimated, 1);
    let ratio_gt = distance(expected, 2)/distance(expected, 1);
    assert_relative_eq!(ratio, ratio_gt, max_relative = 1e-3);
}

#[test]
fn calibration_recovers_intrinsics_and_poses() {
    common::init_logging();
    let config = GeometryConfig::default();
    let scene = common::multi_view_scene(5, 10, 51);
    let projections = scramble(&common::projection_matrices(&scene));

    let calibration = calibrate_from_projection_matrices_if(&projections, common::WIDTH, common::HEIGHT, &config).unwrap();
    assert_intrinsics_close(&calibration.intrinsics, &scene.camera.get_projection(), 0.01);
    assert_eq!(calibration.poses_if.len(), 5);
    for pose in calibration.poses_if.iter() {
        let (_, rotation) = decomp(pose);
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-9);
    }
    assert_poses_up_to_similarity(&calibration.poses_if, &scene.poses_if);
}

#[test]
#[allow(non_snake_case)]
fn absolute_dual_quadric_reproduces_image_of_absolute_conic() {
    let scene = common::multi_view_scene(4, 10, 52);
    let projections = scramble(&common::projection_matrices(&scene));
    let K = scene.camera.get_projection();

    let Q = determine_absolute_dual_quadric_linear_if(&projections, common::WIDTH, common::HEIGHT, true).unwrap();
    assert_relative_eq!(Q, Q.transpose(), epsilon = 1e-12);

    let omega = projections[0]*Q*projections[0].transpose();
    assert!(omega[(2, 2)] > 0.0);
    let expected = K*K.transpose();
    assert_relative_eq!(omega/omega[(2, 2)], expected/expected[(2, 2)], max_relative = 1e-6, epsilon = 1e-6);

    for intrinsics in intrinsics_from_absolute_dual_quadric_if(&Q, &projections).unwrap().iter() {
        assert_intrinsics_close(intrinsics, &K, 1e-6);
    }
}

#[test]
fn three_view_calibration_without_square_pixels() {
    common::init_logging();
    let config = GeometryConfig::default();
    let scene = common::multi_view_scene(3, 10, 53);
    let projections = scramble(&common::projection_matrices(&scene));

    let (intrinsics, _, omega) = find_common_intrinsics_from_projection_matrices_if(&projections, common::WIDTH, common::HEIGHT).unwrap();
    assert_intrinsics_close(&intrinsics, &scene.camera.get_projection(), 0.01);
    assert!(omega[(2, 2)] > 0.0);

    let calibration = calibrate_from_projection_matrices_3_views_if(&projections[0], &projections[1], &projections[2], common::WIDTH, common::HEIGHT, &config).unwrap();
    assert_intrinsics_close(&calibration.intrinsics, &scene.camera.get_projection(), 0.01);
    assert_poses_up_to_similarity(&calibration.poses_if, &scene.poses_if);
}

#[test]
fn calibration_from_six_point_reconstruction() {
    common::init_logging();
    let config = GeometryConfig::default();
    let scene = common::multi_view_scene(5, 30, 54);
    let views = scene.image_points.iter().map(|points| points.as_slice()).collect::<Vec<_>>();
    let mut rng = common::seeded_rng(54);

    let reconstruction = projective_reconstruction_from_6_points_if(&views, &mut rng, &config).unwrap();
    let calibration = calibrate_from_projection_matrices_if(&reconstruction.projection_matrices, common::WIDTH, common::HEIGHT, &config).unwrap();
    assert_intrinsics_close(&calibration.intrinsics, &scene.camera.get_projection(), 0.05);
}

#[test]
fn calibration_needs_three_views() {
    let scene = common::multi_view_scene(2, 10, 55);
    let projections = common::projection_matrices(&scene);
    assert!(matches!(
        calibrate_from_projection_matrices_if(&projections, common::WIDTH, common::HEIGHT, &GeometryConfig::default()),
        Err(GeometryError::InsufficientViews { required: 3, provided: 2 })));
}

#[test]
#[allow(non_snake_case)]
fn unconstrained_common_intrinsics_with_off_center_principal_point() {
    common::init_logging();
    let camera = Perspective::new(530.0, 505.0, 290.0, 265.0, 0.0, common::WIDTH, common::HEIGHT);
    let mut rng = common::seeded_rng(56);
    let poses_if = random_poses_if(5, 0.2, 0.5, &mut rng);
    let scene = SyntheticScene::generate(camera, poses_if, 10, 3.0, 6.0, &mut rng).unwrap();

    // one common projective frame without per view scale factors
    let G = Matrix4::<Float>::new(
        1.0, 0.2, -0.1, 0.3,
        0.1, 0.9, 0.2, -0.2,
        -0.3, 0.1, 1.1, 0.5,
        0.05, -0.02, 0.1, 1.0);
    let projections = common::projection_matrices(&scene).iter().map(|P| P*G*0.002).collect::<Vec<Matrix3x4<Float>>>();

    let (intrinsics, Q, omega) = find_common_intrinsics_from_projection_matrices_unconstrained_if(&projections).unwrap();
    assert_intrinsics_close(&intrinsics, &camera.get_projection(), 0.01);
    assert!(omega[(2, 2)] > 0.0);
    assert_relative_eq!(Q, Q.transpose(), epsilon = 1e-12);

    for P in projections.iter().skip(1) {
        let omega_i = P*Q*P.transpose();
        assert_relative_eq!(omega_i, omega, max_relative = 1e-6, epsilon = 1e-9*omega.norm());
    }

    assert!(matches!(
        find_common_intrinsics_from_projection_matrices_unconstrained_if(&projections[..2]),
        Err(GeometryError::InsufficientViews { required: 3, provided: 2 })));
}
