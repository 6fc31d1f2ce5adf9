extern crate nalgebra as na;

pub mod quadric;

use na::{Matrix3, Matrix3x4, Matrix4, Vector4};
use na::linalg::SymmetricEigen;
use log::{debug, trace};

use crate::{Float, GeometryConfig, GeometryError};
use crate::numerics::pose::{decomp, from_parts, optimal_correction_of_rotation, projection_to_homogeneous};

pub use quadric::{
    AbsoluteDualQuadric,
    absolute_dual_quadric_from_vector,
    determine_absolute_dual_quadric_linear_if,
    find_common_intrinsics_from_projection_matrices_if,
    find_common_intrinsics_from_projection_matrices_unconstrained_if,
    intrinsics_from_absolute_dual_quadric_if,
    linear_system_row_for_absolute_dual_quadric,
    transform_projections_zero_principal_point,
    upper_triangle_cholesky_decomposition
};

/**
 * Shared intrinsics and metric IF poses of a self calibrated sequence.
 * The poses are defined up to one similarity transformation of the world.
 */
#[derive(Debug, Clone)]
pub struct Calibration {
    pub intrinsics: Matrix3<Float>,
    pub poses_if: Vec<Matrix4<Float>>,
    pub absolute_dual_quadric: AbsoluteDualQuadric,
    pub metric_transformation: Matrix4<Float>
}

/**
 * H with Q = H * diag(1,1,1,0) * H^T, so that P * H is metric.
 * H = V * sqrt(|D|) with the eigenvalues sorted in descending order of magnitude.
 * A vanishing fourth eigenvalue is replaced by one to keep H invertible.
 * Multiple View Geometry sec. 19.3 p.462
 */
#[allow(non_snake_case)]
pub fn transform_projective_to_metric_matrix(Q: &AbsoluteDualQuadric, config: &GeometryConfig) -> Result<Matrix4<Float>, GeometryError> {
    let eigen = SymmetricEigen::new(Q.symmetric_part());
    let magnitudes = eigen.eigenvalues.abs();

    let mut order = [0usize, 1, 2, 3];
    order.sort_by(|&a, &b| magnitudes[b].partial_cmp(&magnitudes[a]).unwrap_or(std::cmp::Ordering::Equal));

    let largest = magnitudes[order[0]];
    if largest <= config.eps {
        return Err(GeometryError::Degenerate("absolute dual quadric vanishes"));
    }

    let mut scales = Vector4::<Float>::from_fn(|i, _| magnitudes[order[i]]);
    if scales[3] <= config.weak_eps*largest {
        trace!("replacing vanishing eigenvalue {} of the absolute dual quadric", scales[3]);
        scales[3] = 1.0;
    }

    let mut H = Matrix4::<Float>::zeros();
    for (i, &index) in order.iter().enumerate() {
        H.set_column(i, &(eigen.eigenvectors.column(index)*scales[i].sqrt()));
    }
    Ok(H)
}

/**
 * Applies the metric upgrade P_metric = P * H to every projection. Returns the upgraded projections and H.
 */
#[allow(non_snake_case)]
pub fn transform_projective_to_metric_if(Q: &AbsoluteDualQuadric, projections: &[Matrix3x4<Float>], config: &GeometryConfig) -> Result<(Vec<Matrix3x4<Float>>, Matrix4<Float>), GeometryError> {
    let H = transform_projective_to_metric_matrix(Q, config)?;
    Ok((projections.iter().map(|P| P*H).collect(), H))
}

/**
 * [R|t] = K^-1 * P up to scale. The sign is chosen so that det(R) > 0,
 * the scale is the mean norm of the rotation columns and the rotation block is
 * projected onto the closest rotation afterwards.
 */
#[allow(non_snake_case)]
pub fn metric_projection_matrices_to_poses_if(metric_projections: &[Matrix3x4<Float>], intrinsics: &Matrix3<Float>, config: &GeometryConfig) -> Result<Vec<Matrix4<Float>>, GeometryError> {
    let K_inv = intrinsics.try_inverse().ok_or(GeometryError::SingularMatrix("intrinsics"))?;

    metric_projections.iter().map(|P| {
        let (t, rotation) = decomp(&projection_to_homogeneous(&(K_inv*P)));
        let sign = match rotation.determinant() {
            d if d < 0.0 => -1.0,
            _ => 1.0
        };

        let scale = (rotation.column(0).norm() + rotation.column(1).norm() + rotation.column(2).norm())/3.0;
        if scale <= config.eps {
            return Err(GeometryError::Degenerate("metric projection has no rotational part"));
        }

        let rotation = optimal_correction_of_rotation(&(rotation*(sign/scale))).ok_or(GeometryError::DecompositionFailed("rotation correction"))?;
        Ok(from_parts(&(t*(sign/scale)), &rotation))
    }).collect()
}

/**
 * Averages per view intrinsics and normalizes K(2,2) to one.
 */
fn average_intrinsics(intrinsics: &[Matrix3<Float>], config: &GeometryConfig) -> Result<Matrix3<Float>, GeometryError> {
    let sum = intrinsics.iter().fold(Matrix3::<Float>::zeros(), |acc, k| acc + k);
    match sum[(2,2)] {
        s if s.abs() <= config.eps => Err(GeometryError::Degenerate("averaged intrinsics have vanishing K(2,2)")),
        s => Ok(sum/s)
    }
}

#[allow(non_snake_case)]
fn upgrade(Q: AbsoluteDualQuadric, projections: &[Matrix3x4<Float>], config: &GeometryConfig) -> Result<Calibration, GeometryError> {
    let per_view = intrinsics_from_absolute_dual_quadric_if(&Q, projections)?;
    let intrinsics = average_intrinsics(&per_view, config)?;
    debug!("self calibrated intrinsics fx: {}, fy: {}, cx: {}, cy: {}", intrinsics[(0,0)], intrinsics[(1,1)], intrinsics[(0,2)], intrinsics[(1,2)]);

    let (metric_projections, metric_transformation) = transform_projective_to_metric_if(&Q, projections, config)?;
    let poses_if = metric_projection_matrices_to_poses_if(&metric_projections, &intrinsics, config)?;

    Ok(Calibration { intrinsics, poses_if, absolute_dual_quadric: Q, metric_transformation })
}

/**
 * Self calibration of N >= 3 projective cameras sharing one intrinsic matrix.
 * Assumes zero skew and the principal point at the image center, and square pixels when
 * config.equal_focal_lengths is set.
 */
#[allow(non_snake_case)]
pub fn calibrate_from_projection_matrices_if(projections: &[Matrix3x4<Float>], width: usize, height: usize, config: &GeometryConfig) -> Result<Calibration, GeometryError> {
    let Q = determine_absolute_dual_quadric_linear_if(projections, width, height, config.equal_focal_lengths)?;
    upgrade(Q, projections, config)
}

/**
 * Self calibration of three projective cameras without the square pixel assumption.
 */
#[allow(non_snake_case)]
pub fn calibrate_from_projection_matrices_3_views_if(P1: &Matrix3x4<Float>, P2: &Matrix3x4<Float>, P3: &Matrix3x4<Float>, width: usize, height: usize, config: &GeometryConfig) -> Result<Calibration, GeometryError> {
    let projections = [*P1, *P2, *P3];
    let (_, Q, _) = find_common_intrinsics_from_projection_matrices_if(&projections, width, height)?;
    upgrade(Q, &projections, config)
}
