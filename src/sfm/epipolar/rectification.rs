extern crate nalgebra as na;

use na::{Matrix3, Matrix4, Vector3, UnitQuaternion};
use log::debug;

use crate::{Float, GeometryConfig, GeometryError};
use crate::numerics::dehomogenize;
use crate::numerics::pose::{decomp, flipped_rotation_left_and_right_side};
use crate::sensors::camera::Camera;
use crate::sensors::camera::perspective::Perspective;

/**
 * Homographies mapping rectified image coordinates to original image coordinates.
 * applied_rotation rotates the rectified frame into the left camera frame (standard convention).
 */
#[derive(Debug, Clone)]
pub struct Rectification {
    pub left_homography: Matrix3<Float>,
    pub right_homography: Matrix3<Float>,
    pub applied_rotation: UnitQuaternion<Float>,
    pub camera: Perspective
}

/**
 * Rectifies a stereo pair sharing one camera. left_T_right is the standard pose of the right camera
 * in the left camera frame. The rectified x axis follows the baseline.
 * With adjust_fov the field of view of the rectified camera is grown so that both original images are covered completely.
 */
#[allow(non_snake_case)]
pub fn rectification_homography(left_T_right: &Matrix4<Float>, camera: &Perspective, adjust_fov: bool, config: &GeometryConfig) -> Result<Rectification, GeometryError> {
    let (baseline, left_R_right) = decomp(left_T_right);

    let x_axis = baseline.try_normalize(config.eps).ok_or(GeometryError::Degenerate("zero baseline"))?;
    let y_axis = x_axis.cross(&Vector3::<Float>::new(0.0, 0.0, -1.0)).try_normalize(config.eps)
        .ok_or(GeometryError::Degenerate("baseline parallel to the viewing direction"))?;
    let z_axis = x_axis.cross(&y_axis);

    let left_R_rectified = Matrix3::<Float>::from_columns(&[x_axis, y_axis, z_axis]);
    let applied_rotation = UnitQuaternion::<Float>::from_matrix(&left_R_rectified);

    let flippedLeft_R_flippedRectified = flipped_rotation_left_and_right_side(&left_R_rectified);
    let right_R_rectifiedRight = left_R_right.transpose()*left_R_rectified;
    let flippedRight_R_flippedRectifiedRight = flipped_rotation_left_and_right_side(&right_R_rectifiedRight);

    let new_camera = match adjust_fov {
        true => {
            let fov_left = covering_fov_x(&flippedLeft_R_flippedRectified, camera)?;
            let fov_right = covering_fov_x(&flippedRight_R_flippedRectifiedRight, camera)?;
            let fov = fov_left.max(fov_right);
            debug!("rectification: field of view adjusted from {} to {} rad", camera.fov_x(), fov);
            Perspective::from_fov(camera.width(), camera.height(), fov)?
        },
        false => *camera
    };

    Ok(Rectification {
        left_homography: camera.get_projection()*flippedLeft_R_flippedRectified*new_camera.get_inverse_projection(),
        right_homography: camera.get_projection()*flippedRight_R_flippedRectifiedRight*new_camera.get_inverse_projection(),
        applied_rotation,
        camera: new_camera
    })
}

/**
 * Horizontal field of view of a centered camera that sees all four corners of the original image
 * after rotating them into the rectified frame.
 */
#[allow(non_snake_case)]
fn covering_fov_x(flipped_R_flippedRectified: &Matrix3<Float>, camera: &Perspective) -> Result<Float, GeometryError> {
    let to_rectified = flipped_R_flippedRectified.transpose()*camera.get_inverse_projection();
    let width = camera.width() as Float;
    let height = camera.height() as Float;

    let corner = |x: Float, y: Float| dehomogenize(&(to_rectified*Vector3::<Float>::new(x, y, 1.0)), Float::EPSILON)
        .ok_or(GeometryError::Degenerate("image corner rotated to infinity"));
    let top_left = corner(0.0, 0.0)?;
    let bottom_left = corner(0.0, height)?;
    let top_right = corner(width, 0.0)?;
    let bottom_right = corner(width, height)?;

    let min_x = top_left[0].min(bottom_left[0]);
    let min_y = top_left[1].min(top_right[1]);
    let max_x = top_right[0].max(bottom_right[0]);
    let max_y = bottom_left[1].max(bottom_right[1]);

    let fov_x = 2.0*min_x.atan().abs().max(max_x.atan().abs());
    let fov_y = 2.0*min_y.atan().abs().max(max_y.atan().abs());

    Ok(fov_x.max(Perspective::fov_y_to_x(fov_y, width/height)?))
}
