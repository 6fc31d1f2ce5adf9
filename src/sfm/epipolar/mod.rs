extern crate nalgebra as na;

pub mod tensor;
pub mod rectification;

use na::{Vector2, Vector3, Matrix4};
use log::trace;

use crate::{Float, GeometryConfig, GeometryError};
use crate::numerics::{dehomogenize, right_null_vector3, left_null_vector3};
use crate::numerics::pose::{decomp, invert_rigid, flipped_transformation_left_and_right_side};
use crate::sensors::camera::Camera;

pub use tensor::{Fundamental, Essential, Factorization};

/**
 * Epipoles (left, right) as null vectors of F and F^T.
 * Fails if an epipole lies at infinity.
 */
#[allow(non_snake_case)]
pub fn epipoles(F: &Fundamental, config: &GeometryConfig) -> Result<(Vector2<Float>, Vector2<Float>), GeometryError> {
    let left = right_null_vector3(F)?;
    let right = left_null_vector3(F)?;

    match (dehomogenize(&left, config.eps), dehomogenize(&right, config.eps)) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(GeometryError::Degenerate("epipole at infinity"))
    }
}

/**
 * Epipoles (left, right) as the intersection of two epipolar lines per image.
 * Falls back to the null space computation when the lines do not intersect.
 */
#[allow(non_snake_case)]
pub fn epipoles_fast(F: &Fundamental, config: &GeometryConfig) -> Result<(Vector2<Float>, Vector2<Float>), GeometryError> {
    let p0 = Vector3::<Float>::new(0.0, 0.0, 1.0);
    let p1 = Vector3::<Float>::new(100.0, 200.0, 1.0);

    let right = (F*p0).cross(&(F*p1));
    let left = (F.transpose()*p0).cross(&(F.transpose()*p1));

    match (dehomogenize(&left, config.eps), dehomogenize(&right, config.eps)) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => {
            trace!("epipoles_fast: epipolar lines are parallel, using svd");
            epipoles(F, config)
        }
    }
}

/**
 * Epipoles (left, right) from the standard pose of the right camera in the left camera frame.
 * The left epipole is the projection of the right camera center and vice versa.
 */
#[allow(non_snake_case)]
pub fn epipoles_from_pose<C: Camera>(left_T_right: &Matrix4<Float>, camera_left: &C, camera_right: &C, config: &GeometryConfig) -> Result<(Vector2<Float>, Vector2<Float>), GeometryError> {
    let left_T_right_if = flipped_transformation_left_and_right_side(left_T_right);
    let (right_center_in_left, _) = decomp(&left_T_right_if);
    let (left_center_in_right, _) = decomp(&invert_rigid(&left_T_right_if));

    let left = camera_left.get_projection()*right_center_in_left;
    let right = camera_right.get_projection()*left_center_in_right;

    match (dehomogenize(&left, config.eps), dehomogenize(&right, config.eps)) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(GeometryError::Degenerate("epipole at infinity"))
    }
}

/**
 * Line in the right image on which the correspondence of a left image point lies.
 */
#[allow(non_snake_case)]
pub fn right_epipolar_line(F: &Fundamental, left_point: &Vector2<Float>) -> Vector3<Float> {
    F*Vector3::<Float>::new(left_point[0], left_point[1], 1.0)
}

/**
 * Line in the left image on which the correspondence of a right image point lies.
 */
#[allow(non_snake_case)]
pub fn left_epipolar_line(F: &Fundamental, right_point: &Vector2<Float>) -> Vector3<Float> {
    F.transpose()*Vector3::<Float>::new(right_point[0], right_point[1], 1.0)
}

#[allow(non_snake_case)]
pub fn epipolar_residual(F: &Fundamental, left_point: &Vector2<Float>, right_point: &Vector2<Float>) -> Float {
    let right = Vector3::<Float>::new(right_point[0], right_point[1], 1.0);
    right.dot(&right_epipolar_line(F, left_point)).abs()
}
