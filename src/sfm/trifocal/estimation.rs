extern crate nalgebra as na;

use na::{DMatrix, Vector2};
use log::{debug, warn};

use crate::{Float, GeometryConfig, GeometryError};
use crate::error::check_correspondences;
use crate::numerics::{null_space, right_null_vector};
use crate::sfm::normalization::normalized_points;
use crate::sfm::trifocal::{TrifocalTensor, epipoles_if};

/**
 * Unnormalized linear estimation. Returns the tensor together with the 4n x 27 design matrix.
 * Multiple View Geometry eq. 16.2 p.393
 */
#[allow(non_snake_case)]
pub fn trifocal_tensor_linear(points1: &[Vector2<Float>], points2: &[Vector2<Float>], points3: &[Vector2<Float>], config: &GeometryConfig) -> Result<(TrifocalTensor, DMatrix<Float>), GeometryError> {
    let correspondences = check_correspondences(&[points1.len(), points2.len(), points3.len()], config.min_trifocal_correspondences.max(7))?;

    let mut A = DMatrix::<Float>::zeros(4*correspondences, 27);
    for c in 0..correspondences {
        let point1 = &points1[c];
        let point2 = &points2[c];
        let point3 = &points3[c];

        // summation over k, the third coordinate of the first view is 1
        for k in 0..3 {
            let p1 = match k {
                2 => 1.0,
                k => point1[k]
            };
            for i in 0..2 {
                let p2 = point2[i];
                for l in 0..2 {
                    let p3 = point3[l];
                    let row = 4*c + 2*i + l;
                    A[(row, 9*k + 8)] = p1*p2*p3;
                    A[(row, 9*k + 3*i + 2)] = -p1*p3;
                    A[(row, 9*k + 6 + l)] = -p1*p2;
                    A[(row, 9*k + 3*i + l)] = p1;
                }
            }
        }
    }

    let t = right_null_vector(&A)?;
    Ok((TrifocalTensor::from_vector(t.as_slice())?, A))
}

/**
 * Linear estimation on normalized points, denormalized afterwards.
 * Returns the tensor together with the design matrix of the normalized system.
 * Multiple View Geometry alg. 16.1 p.394
 */
pub fn trifocal_tensor_normalized_linear_with_design_matrix(points1: &[Vector2<Float>], points2: &[Vector2<Float>], points3: &[Vector2<Float>], config: &GeometryConfig) -> Result<(TrifocalTensor, DMatrix<Float>), GeometryError> {
    check_correspondences(&[points1.len(), points2.len(), points3.len()], config.min_trifocal_correspondences.max(7))?;

    let (normalized1, normalization1, _) = normalized_points(points1);
    let (normalized2, _, inverse_normalization2) = normalized_points(points2);
    let (normalized3, _, inverse_normalization3) = normalized_points(points3);

    let (normalized_tensor, design_matrix) = trifocal_tensor_linear(&normalized1, &normalized2, &normalized3, config)?;

    let slices = [0, 1, 2].map(|m| {
        (0..3).fold(na::Matrix3::<Float>::zeros(), |acc, r| {
            acc + normalization1[(r, m)]*(inverse_normalization2*normalized_tensor.slices[r]*inverse_normalization3.transpose())
        })
    });

    Ok((TrifocalTensor { slices }, design_matrix))
}

pub fn trifocal_tensor_normalized_linear(points1: &[Vector2<Float>], points2: &[Vector2<Float>], points3: &[Vector2<Float>], config: &GeometryConfig) -> Result<TrifocalTensor, GeometryError> {
    let (tensor, _) = trifocal_tensor_normalized_linear_with_design_matrix(points1, points2, points3, config)?;
    debug!("trifocal tensor from {} correspondences", points1.len());
    Ok(tensor)
}

/**
 * Experimental: algebraic error minimization within the subspace spanned by the epipoles of the linear estimate.
 * The resulting tensor is not guaranteed to be geometrically valid and is expressed in the normalized
 * coordinates of the linear estimation.
 * Multiple View Geometry alg. 16.2 p.396
 */
#[allow(non_snake_case)]
pub fn trifocal_tensor_minimizing_error(points1: &[Vector2<Float>], points2: &[Vector2<Float>], points3: &[Vector2<Float>], config: &GeometryConfig) -> Result<TrifocalTensor, GeometryError> {
    warn!("trifocal_tensor_minimizing_error is experimental, the result may not be a valid trifocal tensor");

    let (initial, design_matrix) = trifocal_tensor_normalized_linear_with_design_matrix(points1, points2, points3, config)?;
    let A = design_matrix.transpose()*&design_matrix;

    let (e2, e3) = epipoles_if(&initial)?;

    // t = E*a with T_i(j,k) = a(j,i)*e3[k] - e2[j]*b(k,i)
    let mut E = DMatrix::<Float>::zeros(27, 18);
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                let row = 9*i + 3*j + k;
                E[(row, 3*j + i)] = e3[k];
                E[(row, 9 + 3*k + i)] = -e2[j];
            }
        }
    }

    let rank = E.rank(config.rank_eps);
    if rank == 0 {
        return Err(GeometryError::Degenerate("epipole subspace is empty"));
    }

    let svd = E.svd(true, false);
    let u = svd.u.ok_or(GeometryError::DecompositionFailed("epipole subspace svd"))?;
    let U_r = u.columns(0, rank).into_owned();

    let x = null_space(&(A*&U_r), 1)?.pop().ok_or(GeometryError::DecompositionFailed("subspace null vector"))?;
    let t = U_r*x;

    TrifocalTensor::from_vector(t.as_slice())
}
