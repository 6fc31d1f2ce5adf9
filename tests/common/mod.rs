#![allow(dead_code)]

use nalgebra as na;
use rand::SeedableRng;
use rand::rngs::StdRng;

use na::{Matrix3x4, Matrix4, Rotation3, Vector3};
use vision_geometry::Float;
use vision_geometry::numerics::pose::{se3, standard_to_inverted_flipped};
use vision_geometry::sensors::camera::Camera;
use vision_geometry::sensors::camera::perspective::Perspective;
use vision_geometry::sfm::synthetic::{SyntheticScene, random_poses_if};

pub const WIDTH: usize = 640;
pub const HEIGHT: usize = 480;
pub const FOV_X_DEG: Float = 51.3;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn camera() -> Perspective {
    Perspective::from_fov(WIDTH, HEIGHT, FOV_X_DEG.to_radians()).unwrap()
}

/**
 * Standard pose of the right camera in the left camera frame.
 */
#[allow(non_snake_case)]
pub fn left_T_right(translation: Vector3<Float>, roll: Float, pitch: Float, yaw: Float) -> Matrix4<Float> {
    se3(&translation, Rotation3::<Float>::from_euler_angles(roll, pitch, yaw).matrix())
}

/**
 * Two views with the left camera at the world origin.
 */
#[allow(non_snake_case)]
pub fn stereo_scene(left_T_right: &Matrix4<Float>, points: usize, seed: u64) -> SyntheticScene<Perspective> {
    let mut rng = seeded_rng(seed);
    let poses_if = vec![standard_to_inverted_flipped(&Matrix4::<Float>::identity()), standard_to_inverted_flipped(left_T_right)];
    SyntheticScene::generate(camera(), poses_if, points, 1.0, 5.0, &mut rng).unwrap()
}

pub fn multi_view_scene(views: usize, points: usize, seed: u64) -> SyntheticScene<Perspective> {
    let mut rng = seeded_rng(seed);
    let poses_if = random_poses_if(views, 0.2, 0.5, &mut rng);
    SyntheticScene::generate(camera(), poses_if, points, 3.0, 6.0, &mut rng).unwrap()
}

pub fn projection_matrices<C: Camera>(scene: &SyntheticScene<C>) -> Vec<Matrix3x4<Float>> {
    scene.poses_if.iter().map(|pose| scene.camera.projection_matrix_if(pose)).collect()
}

/**
 * Cosine of the angle between two equally sized parameter vectors, ignoring the sign.
 */
pub fn abs_cosine(a: &[Float], b: &[Float]) -> Float {
    let dot = a.iter().zip(b.iter()).map(|(x, y)| x*y).sum::<Float>();
    let norm_a = a.iter().map(|x| x*x).sum::<Float>().sqrt();
    let norm_b = b.iter().map(|x| x*x).sum::<Float>().sqrt();
    (dot/(norm_a*norm_b)).abs()
}
