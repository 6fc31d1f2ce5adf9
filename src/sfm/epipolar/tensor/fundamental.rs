extern crate nalgebra as na;

use na::{DMatrix, DVector, Matrix3, Vector2, Vector3, SMatrix};
use log::debug;

use crate::{Float, GeometryConfig, GeometryError};
use crate::error::check_correspondences;
use crate::numerics::right_null_vector;
use crate::sfm::normalization::normalized_points;
use crate::sfm::epipolar::tensor::Fundamental;

/**
 * Normalized eight point algorithm. The result satisfies x_right^T * F * x_left = 0.
 * Multiple View Geometry alg 11.1 p.282
 */
#[allow(non_snake_case)]
pub fn fundamental_matrix(left_points: &[Vector2<Float>], right_points: &[Vector2<Float>], config: &GeometryConfig) -> Result<Fundamental, GeometryError> {
    let number_of_matches = check_correspondences(&[left_points.len(), right_points.len()], config.min_fundamental_correspondences.max(8))?;

    let (left_normalized, left_normalization, _) = normalized_points(left_points);
    let (right_normalized, right_normalization, _) = normalized_points(right_points);

    let mut A = DMatrix::<Float>::zeros(number_of_matches, 9);
    for i in 0..number_of_matches {
        A.row_mut(i).copy_from(&linear_coefficients(&left_normalized[i], &right_normalized[i]));
    }

    let f = right_null_vector(&A)?;
    let F_normalized = enforce_rank_two(&to_fundamental(&f))?;

    let F = right_normalization.transpose()*F_normalized*left_normalization;
    let norm = F.norm();
    match norm {
        n if n > config.eps => {
            debug!("fundamental matrix from {} correspondences", number_of_matches);
            Ok(F/n)
        },
        _ => Err(GeometryError::Degenerate("fundamental matrix vanished after denormalization"))
    }
}

/**
 * Zeroes the smallest singular value.
 */
#[allow(non_snake_case)]
pub fn enforce_rank_two(F: &Matrix3<Float>) -> Result<Matrix3<Float>, GeometryError> {
    let mut svd = F.svd(true,true);
    let min_idx = svd.singular_values.imin();
    svd.singular_values[min_idx] = 0.0;
    svd.recompose().map_err(|_| GeometryError::DecompositionFailed("rank two recomposition"))
}

fn to_fundamental(f: &DVector<Float>) -> Fundamental {
    Matrix3::<Float>::new(
        f[0], f[1], f[2],
        f[3], f[4], f[5],
        f[6], f[7], f[8]
    )
}

/**
 * Row of the linear system for the row major entries of F.
 */
fn linear_coefficients(feature_left: &Vector2<Float>, feature_right: &Vector2<Float>) -> SMatrix<Float, 1, 9> {
    let l = Vector3::<Float>::new(feature_left[0], feature_left[1], 1.0);
    let r = Vector3::<Float>::new(feature_right[0], feature_right[1], 1.0);

    SMatrix::<Float, 1, 9>::from_fn(|_, c| r[c / 3]*l[c % 3])
}
