extern crate nalgebra as na;

use na::{Vector2, Vector3, Vector4, Matrix3, Matrix3x4, Matrix4};
use crate::Float;
use crate::numerics::pose::{projection_block, standard_to_inverted_flipped};

pub mod perspective;

/**
 * Camera model in the inverted flipped convention: points in front of the camera have positive z.
 */
pub trait Camera {
    fn get_projection(&self) -> Matrix3<Float>;
    fn get_inverse_projection(&self) -> Matrix3<Float>;
    fn project(&self, position: &Vector3<Float>) -> Option<Vector2<Float>>;
    fn backproject(&self, point: &Vector2<Float>, depth: Float) -> Vector3<Float>;
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /**
     * K * [R|t] for a flippedCamera_T_world pose.
     */
    #[allow(non_snake_case)]
    fn projection_matrix_if(&self, flippedCamera_T_world: &Matrix4<Float>) -> Matrix3x4<Float> {
        self.get_projection()*projection_block(flippedCamera_T_world)
    }

    #[allow(non_snake_case)]
    fn project_to_image_if(&self, flippedCamera_T_world: &Matrix4<Float>, world_point: &Vector3<Float>) -> Option<Vector2<Float>> {
        let camera_point = flippedCamera_T_world*Vector4::<Float>::new(world_point[0], world_point[1], world_point[2], 1.0);
        self.project(&camera_point.fixed_rows::<3>(0).into_owned())
    }

    #[allow(non_snake_case)]
    fn project_to_image(&self, world_T_camera: &Matrix4<Float>, world_point: &Vector3<Float>) -> Option<Vector2<Float>> {
        self.project_to_image_if(&standard_to_inverted_flipped(world_T_camera), world_point)
    }
}
