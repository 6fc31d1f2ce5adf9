extern crate nalgebra as na;

pub mod fundamental;

use na::{Matrix3, Matrix4, Vector2, Vector3};
use log::debug;

use crate::{Float, GeometryConfig, GeometryError};
use crate::error::check_correspondences;
use crate::numerics::pose::{decomp, from_parts, invert_rigid, flipped_transformation_left_and_right_side};
use crate::sensors::camera::Camera;
use crate::sfm::triangulation::linear_triangulation_svd;

pub type Fundamental = Matrix3<Float>;
pub type Essential = Matrix3<Float>;

/**
 * Result of the essential matrix factorization.
 * left_T_right is the standard pose of the right camera in the left camera frame with unit baseline.
 */
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy)]
pub struct Factorization {
    pub left_T_right: Matrix4<Float>,
    pub valid_points: usize
}

/**
 * Essential matrix for the standard pose left_T_right such that x_right^T * E * x_left = 0
 * for normalized image coordinates in the inverted flipped convention.
 */
#[allow(non_snake_case)]
pub fn essential_matrix(left_T_right: &Matrix4<Float>) -> Essential {
    let right_T_left_if = invert_rigid(&flipped_transformation_left_and_right_side(left_T_right));
    let (translation, rotation) = decomp(&right_T_left_if);
    translation.cross_matrix()*rotation
}

/**
 * F = K_right^-T * E * K_left^-1
 */
#[allow(non_snake_case)]
pub fn essential_to_fundamental<C: Camera>(E: &Essential, camera_left: &C, camera_right: &C) -> Fundamental {
    camera_right.get_inverse_projection().transpose()*E*camera_left.get_inverse_projection()
}

/**
 * E = K_right^T * F * K_left
 */
#[allow(non_snake_case)]
pub fn fundamental_to_essential<C: Camera>(F: &Fundamental, camera_left: &C, camera_right: &C) -> Essential {
    camera_right.get_projection().transpose()*F*camera_left.get_projection()
}

/**
 * Counts the correspondences that triangulate in front of both cameras for the
 * inverted flipped candidate right_T_left_if (left camera at the origin).
 */
#[allow(non_snake_case)]
pub fn validate_camera_pose<C: Camera>(right_T_left_if: &Matrix4<Float>, camera_left: &C, camera_right: &C, left_points: &[Vector2<Float>], right_points: &[Vector2<Float>], config: &GeometryConfig) -> usize {
    let projections = [
        camera_left.projection_matrix_if(&Matrix4::<Float>::identity()),
        camera_right.projection_matrix_if(right_T_left_if)
    ];

    left_points.iter().zip(right_points.iter()).filter(|(l, r)| {
        match linear_triangulation_svd(&projections, &[**l, **r]) {
            Ok(p) if p[3].abs() > config.eps => {
                let x = p.fixed_rows::<3>(0)/p[3];
                x[2] > 0.0 && (right_T_left_if*x.push(1.0))[2] > 0.0
            },
            _ => false
        }
    }).count()
}

/**
 * Recovers the relative pose from an essential matrix by testing the four (R,t) candidates for cheirality.
 * Ties are resolved in favour of the earlier candidate.
 * Multiple View Geometry p.259
 */
#[allow(non_snake_case)]
pub fn factorize_essential<C: Camera>(E: &Essential, camera_left: &C, camera_right: &C, left_points: &[Vector2<Float>], right_points: &[Vector2<Float>], config: &GeometryConfig) -> Result<Factorization, GeometryError> {
    check_correspondences(&[left_points.len(), right_points.len()], 1)?;

    let svd = E.svd(true,true);
    let singular_values = svd.singular_values;
    let svd = match (singular_values[0] - singular_values[1]).abs() {
        d if d > config.eps => {
            let mut repaired = svd;
            let average = (singular_values[0] + singular_values[1])*0.5;
            repaired.singular_values = Vector3::<Float>::new(average, average, 0.0);
            let E_repaired = repaired.recompose().map_err(|_| GeometryError::DecompositionFailed("essential recomposition"))?;
            E_repaired.svd(true,true)
        },
        _ => svd
    };

    let u = svd.u.ok_or(GeometryError::DecompositionFailed("essential svd"))?;
    let v_t = svd.v_t.ok_or(GeometryError::DecompositionFailed("essential svd"))?;

    let W = Matrix3::<Float>::new(0.0, -1.0, 0.0,
                                  1.0, 0.0, 0.0,
                                  0.0, 0.0, 1.0);

    let (R0, R1) = match u*W*v_t {
        R if R.determinant() < 0.0 => (-R, -(u*W.transpose()*v_t)),
        R => (R, u*W.transpose()*v_t)
    };
    let t = u.column(2).into_owned();

    let candidates = [(R0, t), (R0, -t), (R1, t), (R1, -t)];
    let mut best: Option<(usize, Matrix4<Float>)> = None;
    for (R, t) in candidates.iter() {
        let right_T_left_if = from_parts(t, R);
        let count = validate_camera_pose(&right_T_left_if, camera_left, camera_right, left_points, right_points, config);
        debug!("factorize_essential: candidate with {} points in front", count);
        best = match best {
            Some((best_count, _)) if best_count >= count => best,
            _ => Some((count, right_T_left_if))
        };
    }

    match best {
        Some((valid_points, right_T_left_if)) if valid_points > 0 => Ok(Factorization {
            left_T_right: flipped_transformation_left_and_right_side(&invert_rigid(&right_T_left_if)),
            valid_points
        }),
        _ => Err(GeometryError::Degenerate("no pose candidate places points in front of both cameras"))
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use na::Rotation3;
    use crate::numerics::pose::se3;

    #[test]
    fn essential_has_two_equal_singular_values() {
        let left_T_right = se3(&Vector3::<Float>::new(0.3, -0.1, 0.2), Rotation3::<Float>::from_euler_angles(0.05, 0.1, -0.02).matrix());
        let E = essential_matrix(&left_T_right);
        let mut s = E.svd(false,false).singular_values.as_slice().to_vec();
        s.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_relative_eq!(s[0], s[1], epsilon = 1e-12);
        assert_relative_eq!(s[2], 0.0, epsilon = 1e-12);
    }
}
