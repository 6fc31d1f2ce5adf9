extern crate nalgebra as na;

use na::{DMatrix, Matrix3, Matrix3x4, Matrix4, RowSVector};
use na::linalg::Cholesky;
use log::{debug, trace};

use crate::{Float, GeometryError};
use crate::numerics::{right_null_vector, rotate_entries_180};

pub type AbsoluteDualQuadric = Matrix4<Float>;

/// Position of the upper triangle entries (row, col) of Q in its 10 vector.
const QUADRIC_ENTRIES: [(usize, usize); 10] = [(0,0), (0,1), (0,2), (0,3), (1,1), (1,2), (1,3), (2,2), (2,3), (3,3)];

/**
 * Coefficients of w(row, col) = P.row(row) * Q * P.row(col)^T in the 10 parameters of the symmetric Q.
 * Multiple View Geometry eq. 19.7 p.464
 */
#[allow(non_snake_case)]
pub fn linear_system_row_for_absolute_dual_quadric(row: usize, col: usize, P: &Matrix3x4<Float>) -> Result<RowSVector<Float, 10>, GeometryError> {
    if row >= 3 || col >= 3 {
        return Err(GeometryError::Degenerate("conic entry outside of 3x3"));
    }
    Ok(RowSVector::<Float, 10>::from_fn(|_, n| {
        let (a, b) = QUADRIC_ENTRIES[n];
        match a == b {
            true => P[(row, a)]*P[(col, a)],
            false => P[(row, a)]*P[(col, b)] + P[(row, b)]*P[(col, a)]
        }
    }))
}

/**
 * Symmetric 4x4 matrix from the entries (00,01,02,03,11,12,13,22,23,33).
 */
#[allow(non_snake_case)]
pub fn absolute_dual_quadric_from_vector(q: &[Float]) -> Result<AbsoluteDualQuadric, GeometryError> {
    if q.len() != QUADRIC_ENTRIES.len() {
        return Err(GeometryError::InvalidLength { expected: QUADRIC_ENTRIES.len(), provided: q.len() });
    }
    let mut Q = Matrix4::<Float>::zeros();
    for (&value, &(a, b)) in q.iter().zip(QUADRIC_ENTRIES.iter()) {
        Q[(a, b)] = value;
        Q[(b, a)] = value;
    }
    Ok(Q)
}

/**
 * Moves the principal point of an image of the given size to the origin and scales by w+h.
 * Returns the transformed projections T^-1 * P together with T.
 */
pub fn transform_projections_zero_principal_point(projections: &[Matrix3x4<Float>], width: usize, height: usize) -> Result<(Vec<Matrix3x4<Float>>, Matrix3<Float>), GeometryError> {
    let scale = (width + height) as Float;
    let transformation = Matrix3::<Float>::new(
        scale, 0.0, (width/2) as Float,
        0.0, scale, (height/2) as Float,
        0.0, 0.0, 1.0);
    let inverse_transformation = transformation.try_inverse().ok_or(GeometryError::SingularMatrix("zero sized image"))?;
    Ok((projections.iter().map(|p| inverse_transformation*p).collect(), transformation))
}

fn check_views(projections: &[Matrix3x4<Float>]) -> Result<(), GeometryError> {
    match projections.len() {
        n if n < 3 => Err(GeometryError::InsufficientViews { required: 3, provided: n }),
        _ => Ok(())
    }
}

/**
 * Solves A*q = 0 and orients Q so that w(2,2) of the reference projection is positive.
 */
#[allow(non_snake_case)]
fn solve_quadric(A: &DMatrix<Float>, reference: &Matrix3x4<Float>) -> Result<AbsoluteDualQuadric, GeometryError> {
    let q = right_null_vector(A)?;
    let Q = absolute_dual_quadric_from_vector(q.as_slice())?;
    match (reference*Q*reference.transpose())[(2,2)] {
        w if w < 0.0 => Ok(-Q),
        _ => Ok(Q)
    }
}

/**
 * Linear estimate of Q assuming zero skew and the principal point at the image center.
 * With equal_fx_fy the aspect ratio is additionally constrained to one.
 * Multiple View Geometry sec. 19.3.1 p.463
 */
#[allow(non_snake_case)]
pub fn determine_absolute_dual_quadric_linear_if(projections: &[Matrix3x4<Float>], width: usize, height: usize, equal_fx_fy: bool) -> Result<AbsoluteDualQuadric, GeometryError> {
    check_views(projections)?;
    let (normalized, _) = transform_projections_zero_principal_point(projections, width, height)?;

    let rows_per_view = match equal_fx_fy {
        true => 4,
        false => 3
    };
    let mut A = DMatrix::<Float>::zeros(rows_per_view*normalized.len(), 10);
    for (i, P) in normalized.iter().enumerate() {
        let offset = rows_per_view*i;
        A.row_mut(offset).copy_from(&(2.0*linear_system_row_for_absolute_dual_quadric(0, 2, P)?));
        A.row_mut(offset + 1).copy_from(&(2.0*linear_system_row_for_absolute_dual_quadric(1, 2, P)?));
        // skew is weighted higher
        A.row_mut(offset + 2).copy_from(&(20.0*linear_system_row_for_absolute_dual_quadric(0, 1, P)?));
        if equal_fx_fy {
            A.row_mut(offset + 3).copy_from(&(linear_system_row_for_absolute_dual_quadric(0, 0, P)? - linear_system_row_for_absolute_dual_quadric(1, 1, P)?));
        }
    }

    trace!("absolute dual quadric system with {} equations", A.nrows());
    solve_quadric(&A, &normalized[0])
}

/**
 * Intrinsics shared by all views without constraining the aspect ratio.
 * Q is estimated from the zero skew and centered principal point constraints of every view,
 * the intrinsics are then read from the first view.
 * Returns (K, Q, w) where w = P_0 * Q * P_0^T.
 */
#[allow(non_snake_case)]
pub fn find_common_intrinsics_from_projection_matrices_if(projections: &[Matrix3x4<Float>], width: usize, height: usize) -> Result<(Matrix3<Float>, AbsoluteDualQuadric, Matrix3<Float>), GeometryError> {
    check_views(projections)?;
    let (normalized, _) = transform_projections_zero_principal_point(projections, width, height)?;

    let mut A = DMatrix::<Float>::zeros(3*normalized.len(), 10);
    for (i, P) in normalized.iter().enumerate() {
        A.row_mut(3*i).copy_from(&linear_system_row_for_absolute_dual_quadric(0, 2, P)?);
        A.row_mut(3*i + 1).copy_from(&linear_system_row_for_absolute_dual_quadric(1, 2, P)?);
        A.row_mut(3*i + 2).copy_from(&(10.0*linear_system_row_for_absolute_dual_quadric(0, 1, P)?));
    }

    let Q = solve_quadric(&A, &normalized[0])?;
    let omega = projections[0]*Q*projections[0].transpose();
    let K = upper_triangle_cholesky_decomposition(&omega)?;
    Ok((K, Q, omega))
}

/**
 * Intrinsics shared by all views without any assumption on skew or principal point.
 * Q is constrained by w_i = w_0 on the entries (0,0), (1,1), (0,1), (0,2) and (1,2) of every further view,
 * so the projections must share one consistent projective scale.
 * Returns (K, Q, w) where w = P_0 * Q * P_0^T.
 */
#[allow(non_snake_case)]
pub fn find_common_intrinsics_from_projection_matrices_unconstrained_if(projections: &[Matrix3x4<Float>]) -> Result<(Matrix3<Float>, AbsoluteDualQuadric, Matrix3<Float>), GeometryError> {
    check_views(projections)?;
    let P0 = &projections[0];
    let entries = [(0, 0), (1, 1), (0, 1), (0, 2), (1, 2)];

    let mut A = DMatrix::<Float>::zeros(entries.len()*(projections.len() - 1), 10);
    for (i, P) in projections.iter().skip(1).enumerate() {
        for (e, &(row, col)) in entries.iter().enumerate() {
            let difference = linear_system_row_for_absolute_dual_quadric(row, col, P0)? - linear_system_row_for_absolute_dual_quadric(row, col, P)?;
            A.row_mut(entries.len()*i + e).copy_from(&difference);
        }
    }

    trace!("unconstrained absolute dual quadric system with {} equations", A.nrows());
    let Q = solve_quadric(&A, P0)?;
    let omega = P0*Q*P0.transpose();
    let K = upper_triangle_cholesky_decomposition(&omega)?;
    Ok((K, Q, omega))
}

/**
 * K_i from w_i = P_i * Q * P_i^T = K_i * K_i^T for every view.
 */
#[allow(non_snake_case)]
pub fn intrinsics_from_absolute_dual_quadric_if(Q: &AbsoluteDualQuadric, projections: &[Matrix3x4<Float>]) -> Result<Vec<Matrix3<Float>>, GeometryError> {
    projections.iter().map(|P| upper_triangle_cholesky_decomposition(&(P*Q*P.transpose()))).collect()
}

/**
 * Upper triangular K with w = K * K^T, positive diagonal and K(2,2) = 1.
 * The entries are rotated by 180 degrees so that the lower triangular Cholesky factor
 * rotated back is upper triangular.
 */
#[allow(non_snake_case)]
pub fn upper_triangle_cholesky_decomposition(omega: &Matrix3<Float>) -> Result<Matrix3<Float>, GeometryError> {
    let flipped = rotate_entries_180(&omega.symmetric_part());
    let cholesky = Cholesky::new(flipped).ok_or(GeometryError::DecompositionFailed("image of the absolute conic is not positive definite"))?;
    let mut K = rotate_entries_180(&cholesky.l());

    for c in 0..3 {
        if K[(c, c)] < 0.0 {
            K.column_mut(c).neg_mut();
        }
    }

    match K[(2, 2)] {
        k if k.abs() <= Float::EPSILON => {
            debug!("degenerate intrinsics, K(2,2) = {}", k);
            Err(GeometryError::Degenerate("intrinsics have vanishing K(2,2)"))
        },
        k => Ok(K/k)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_projection() -> Matrix3x4<Float> {
        Matrix3x4::<Float>::new(
            1.2, -0.3, 0.5, 2.0,
            0.1, 0.9, -0.7, -1.0,
            0.4, 0.2, 1.1, 3.0)
    }

    #[test]
    fn linear_row_matches_quadratic_form() {
        let q = [0.9, 0.1, -0.2, 0.3, 1.4, 0.05, -0.6, 0.7, 0.25, 2.0];
        let Q = absolute_dual_quadric_from_vector(&q).unwrap();
        let P = sample_projection();
        let omega = P*Q*P.transpose();
        let q_vector = na::SVector::<Float, 10>::from_column_slice(&q);

        for r in 0..3 {
            for c in 0..3 {
                let row = linear_system_row_for_absolute_dual_quadric(r, c, &P).unwrap();
                assert_relative_eq!((row*q_vector)[0], omega[(r, c)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn quadric_from_vector_is_symmetric() {
        let Q = absolute_dual_quadric_from_vector(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
        assert_relative_eq!(Q, Q.transpose());
        assert_eq!(Q.row(1).into_owned(), na::RowVector4::<Float>::new(2.0, 5.0, 6.0, 7.0));
        assert_eq!(Q[(3, 3)], 10.0);
    }

    #[test]
    fn malformed_quadric_arguments() {
        assert!(matches!(
            absolute_dual_quadric_from_vector(&[1.0; 9]),
            Err(GeometryError::InvalidLength { expected: 10, provided: 9 })));
        assert!(matches!(
            linear_system_row_for_absolute_dual_quadric(3, 0, &sample_projection()),
            Err(GeometryError::Degenerate(_))));
    }

    #[test]
    fn upper_cholesky_recovers_intrinsics() {
        let K = Matrix3::<Float>::new(
            520.0, 1.5, 320.0,
            0.0, 510.0, 240.0,
            0.0, 0.0, 1.0);
        let omega = 3.5*K*K.transpose();
        let recovered = upper_triangle_cholesky_decomposition(&omega).unwrap();
        assert_relative_eq!(recovered, K, epsilon = 1e-6);
    }

    #[test]
    fn cholesky_of_indefinite_matrix_fails() {
        let omega = Matrix3::<Float>::from_diagonal(&na::Vector3::<Float>::new(1.0, -2.0, 1.0));
        assert!(upper_triangle_cholesky_decomposition(&omega).is_err());
    }

    #[test]
    fn zero_principal_point_transform() {
        let (normalized, T) = transform_projections_zero_principal_point(&[sample_projection()], 640, 480).unwrap();
        assert_relative_eq!(T*normalized[0], sample_projection(), epsilon = 1e-12);
        let center = T.try_inverse().unwrap()*na::Vector3::<Float>::new(320.0, 240.0, 1.0);
        assert_relative_eq!(center, na::Vector3::<Float>::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn too_few_views_are_rejected() {
        let projections = [sample_projection(), sample_projection()];
        assert!(matches!(
            determine_absolute_dual_quadric_linear_if(&projections, 640, 480, true),
            Err(GeometryError::InsufficientViews { required: 3, provided: 2 })));
    }
}
