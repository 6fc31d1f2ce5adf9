extern crate nalgebra as na;

use na::{Vector3, Matrix3, Matrix4, Matrix3x4, Isometry, Translation3, Rotation3, UnitQuaternion};
use crate::Float;

/**
 * Poses come in two conventions.
 * Standard: world_T_camera, the camera looks along its negative z axis with y pointing up.
 * Inverted flipped (IF): flippedCamera_T_world, the camera looks along its positive z axis with y pointing down.
 * The flip is a rotation of 180 degrees around the x axis.
 */
pub fn flip_matrix3() -> Matrix3<Float> {
    Matrix3::<Float>::from_diagonal(&Vector3::<Float>::new(1.0, -1.0, -1.0))
}

pub fn flip_matrix4() -> Matrix4<Float> {
    Matrix4::<Float>::from_diagonal(&na::Vector4::<Float>::new(1.0, -1.0, -1.0, 1.0))
}

pub fn se3(t: &Vector3<Float>, rotation: &Matrix3<Float>) -> Matrix4<Float> {
    Isometry::<Float, Rotation3<Float>,3>::from_parts(Translation3::from(*t), Rotation3::from_matrix(rotation)).to_homogeneous()
}

/**
 * Builds a 4x4 transform from its blocks without re-orthonormalizing the rotation.
 */
pub fn from_parts(t: &Vector3<Float>, rotation: &Matrix3<Float>) -> Matrix4<Float> {
    let mut transform = Matrix4::<Float>::identity();
    transform.fixed_view_mut::<3,3>(0,0).copy_from(rotation);
    transform.fixed_view_mut::<3,1>(0,3).copy_from(t);
    transform
}

pub fn decomp(transform: &Matrix4<Float>) -> (Vector3<Float>, Matrix3<Float>) {
    (transform.fixed_view::<3,1>(0,3).into_owned(), transform.fixed_view::<3,3>(0,0).into_owned())
}

/**
 * Inverse of a rigid transformation.
 */
pub fn invert_rigid(transform: &Matrix4<Float>) -> Matrix4<Float> {
    let (t, rotation) = decomp(transform);
    let rotation_t = rotation.transpose();
    from_parts(&(-rotation_t*t), &rotation_t)
}

#[allow(non_snake_case)]
pub fn flipped_transformation_left_and_right_side(left_T_right: &Matrix4<Float>) -> Matrix4<Float> {
    flip_matrix4()*left_T_right*flip_matrix4()
}

#[allow(non_snake_case)]
pub fn flipped_rotation_left_and_right_side(left_R_right: &Matrix3<Float>) -> Matrix3<Float> {
    flip_matrix3()*left_R_right*flip_matrix3()
}

/**
 * world_T_camera -> flippedCamera_T_world
 */
#[allow(non_snake_case)]
pub fn standard_to_inverted_flipped(world_T_camera: &Matrix4<Float>) -> Matrix4<Float> {
    invert_rigid(&(world_T_camera*flip_matrix4()))
}

/**
 * flippedCamera_T_world -> world_T_camera
 */
#[allow(non_snake_case)]
pub fn inverted_flipped_to_standard(flippedCamera_T_world: &Matrix4<Float>) -> Matrix4<Float> {
    invert_rigid(flippedCamera_T_world)*flip_matrix4()
}

/**
 * Upper 3x4 block of a 4x4 matrix, i.e. a projection matrix stored as homogeneous transform.
 */
pub fn projection_block(transform: &Matrix4<Float>) -> Matrix3x4<Float> {
    transform.fixed_view::<3,4>(0,0).into_owned()
}

/**
 * Embeds a 3x4 projection into a 4x4 matrix with bottom row [0,0,0,1].
 */
pub fn projection_to_homogeneous(projection: &Matrix3x4<Float>) -> Matrix4<Float> {
    let mut transform = Matrix4::<Float>::identity();
    transform.fixed_view_mut::<3,4>(0,0).copy_from(projection);
    transform
}

pub fn rotation_angle_between(a: &Matrix3<Float>, b: &Matrix3<Float>) -> Float {
    let difference = a.transpose()*b;
    UnitQuaternion::<Float>::from_matrix(&difference).angle()
}

/**
 * 3D Rotations - Kanatani p.35
 */
pub fn optimal_correction_of_rotation(rotation: &Matrix3<Float>) -> Option<Matrix3<Float>> {
    let svd = rotation.svd(true,true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let d = Matrix3::<Float>::from_diagonal(&Vector3::<Float>::new(1.0, 1.0, (u*v_t).determinant()));
    Some(u*d*v_t)
}
