extern crate nalgebra as na;
use color_eyre::eyre::Result;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use vision_geometry::{Float, GeometryConfig};
use vision_geometry::sensors::camera::Camera;
use vision_geometry::sensors::camera::perspective::Perspective;
use vision_geometry::sfm::autocalibration::calibrate_from_projection_matrices_if;
use vision_geometry::sfm::projective::projective_reconstruction_from_6_points_if;
use vision_geometry::sfm::synthetic::{SyntheticScene, random_poses_if};
use vision_geometry::sfm::trifocal::{error_matrix, trifocal_tensor_normalized_linear};

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => GeometryConfig::load(path)?,
        None => GeometryConfig::default()
    };

    let width = 640;
    let height = 480;
    let camera = Perspective::from_fov(width, height, (51.3 as Float).to_radians())?;

    let mut rng = SmallRng::seed_from_u64(0xCA11B);
    let poses_if = random_poses_if(5, 0.2, 0.5, &mut rng);
    let scene = SyntheticScene::generate(camera, poses_if, 50, 3.0, 6.0, &mut rng)?;
    let noisy = scene.noisy_image_points(0.2, &mut rng);

    let tensor = trifocal_tensor_normalized_linear(&noisy[0], &noisy[1], &noisy[2], &config)?;
    let (mean_error, _) = error_matrix(&tensor.normalized(), &noisy[0], &noisy[1], &noisy[2])?;
    println!("trifocal incidence error of the first three views: {}", mean_error);

    let views = noisy.iter().map(|points| points.as_slice()).collect::<Vec<_>>();
    let reconstruction = projective_reconstruction_from_6_points_if(&views, &mut rng, &config)?;
    println!("projective reconstruction from points {:?}, mean squared error {}", reconstruction.indices, reconstruction.squared_error);

    let calibration = calibrate_from_projection_matrices_if(&reconstruction.projection_matrices, width, height, &config)?;
    println!("estimated intrinsics: {}", calibration.intrinsics);
    println!("ground truth intrinsics: {}", scene.camera.get_projection());
    for (i, pose) in calibration.poses_if.iter().enumerate() {
        println!("pose {}: {}", i, pose);
    }

    Ok(())
}
