extern crate nalgebra as na;
use color_eyre::eyre::Result;

use na::{Matrix4, Rotation3, Vector3};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use vision_geometry::{Float, GeometryConfig};
use vision_geometry::numerics::pose::{decomp, rotation_angle_between, se3, standard_to_inverted_flipped};
use vision_geometry::sensors::camera::perspective::Perspective;
use vision_geometry::sfm::epipolar::{epipoles, epipoles_from_pose};
use vision_geometry::sfm::epipolar::rectification::rectification_homography;
use vision_geometry::sfm::epipolar::tensor::{factorize_essential, fundamental_to_essential};
use vision_geometry::sfm::epipolar::tensor::fundamental::fundamental_matrix;
use vision_geometry::sfm::synthetic::SyntheticScene;
use vision_geometry::sfm::triangulation::triangulate_image_points;

#[allow(non_snake_case)]
fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => GeometryConfig::load(path)?,
        None => GeometryConfig::default()
    };

    let camera = Perspective::from_fov(640, 480, (51.3 as Float).to_radians())?;
    let left_T_right = se3(&Vector3::<Float>::new(0.05, 0.0, 0.0), Rotation3::<Float>::from_euler_angles(0.0, 0.03, 0.0).matrix());
    let poses_if = vec![standard_to_inverted_flipped(&Matrix4::<Float>::identity()), standard_to_inverted_flipped(&left_T_right)];

    let mut rng = SmallRng::seed_from_u64(0x5EED);
    let scene = SyntheticScene::generate(camera, poses_if, 100, 1.0, 4.0, &mut rng)?;
    let noisy = scene.noisy_image_points(0.5, &mut rng);
    let (left, right) = (&noisy[0], &noisy[1]);
    println!("{} correspondences", left.len());

    let fundamental = fundamental_matrix(left, right, &config)?;
    let (left_epipole, right_epipole) = epipoles(&fundamental, &config)?;
    let (left_epipole_gt, right_epipole_gt) = epipoles_from_pose(&left_T_right, &camera, &camera, &config)?;
    println!("left epipole: {} (ground truth {})", left_epipole, left_epipole_gt);
    println!("right epipole: {} (ground truth {})", right_epipole, right_epipole_gt);

    let essential = fundamental_to_essential(&fundamental, &camera, &camera);
    let factorization = factorize_essential(&essential, &camera, &camera, left, right, &config)?;
    let (t, rotation) = decomp(&factorization.left_T_right);
    let (t_gt, rotation_gt) = decomp(&left_T_right);
    println!("rotation error: {} deg", rotation_angle_between(&rotation, &rotation_gt).to_degrees());
    println!("translation direction: {} (ground truth {})", t, t_gt.normalize());
    println!("{} of {} points in front of both cameras", factorization.valid_points, left.len());

    let world_T_right = factorization.left_T_right;
    let triangulated = triangulate_image_points(&camera, &Matrix4::<Float>::identity(), &camera, &world_T_right, left, right, &Vector3::<Float>::zeros(), true, &config)?;
    println!("triangulated {} points, {} invalid", triangulated.valid_count(), triangulated.invalid_indices.len());

    let rectification = rectification_homography(&left_T_right, &camera, true, &config)?;
    println!("rectified field of view: {} deg", rectification.camera.fov_x().to_degrees());
    println!("left homography: {}", rectification.left_homography);
    println!("right homography: {}", rectification.right_homography);

    Ok(())
}
