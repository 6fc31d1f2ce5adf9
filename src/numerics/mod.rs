extern crate nalgebra as na;

use na::{DMatrix, DVector, Matrix3, Vector3};
use crate::{Float, float, GeometryError};

pub mod pose;

const ROOT_EPS: Float = 1e-12;
const ROOT_MERGE_EPS: Float = 1e-8;

/**
 * Real roots of a*x^2 + b*x + c = 0 in ascending order.
 * A double root is reported once.
 */
pub fn quadratic_roots(a: Float, b: Float, c: Float) -> Vec<Float> {
    if a.abs() < ROOT_EPS {
        return match b {
            b if b.abs() < ROOT_EPS => vec![],
            b => vec![-c/b]
        };
    }

    let det = b.powi(2)-4.0*a*c;
    match det {
        det if det > ROOT_EPS => {
            let det_sqrt = det.sqrt();
            let r0 = (-b - det_sqrt)/(2.0*a);
            let r1 = (-b + det_sqrt)/(2.0*a);
            if r0 < r1 { vec![r0,r1] } else { vec![r1,r0] }
        },
        det if det < -ROOT_EPS => vec![],
        _ => vec![-b/(2.0*a)]
    }
}

/**
 * Distinct real roots of a3*x^3 + a2*x^2 + a1*x + a0 = 0 in ascending order.
 * Cardano for one real root, the trigonometric form for three. A repeated root yields two values.
 */
pub fn solve_cubic(a3: Float, a2: Float, a1: Float, a0: Float) -> Vec<Float> {
    if a3.abs() < ROOT_EPS {
        return quadratic_roots(a2, a1, a0);
    }

    let b = a2/a3;
    let c = a1/a3;
    let d = a0/a3;

    let p = c - b*b/3.0;
    let q = 2.0*b.powi(3)/27.0 - b*c/3.0 + d;
    let shift = b/3.0;
    let disc = (q*0.5).powi(2) + (p/3.0).powi(3);

    let mut roots = match disc {
        disc if disc > ROOT_EPS => {
            let sqrt_disc = disc.sqrt();
            let u = (-q*0.5 + sqrt_disc).cbrt();
            let v = (-q*0.5 - sqrt_disc).cbrt();
            vec![u + v - shift]
        },
        disc if disc < -ROOT_EPS => {
            let r = (-p/3.0).sqrt();
            let phi = ((-q*0.5)/r.powi(3)).max(-1.0).min(1.0).acos();
            (0..3).map(|k| 2.0*r*((phi + 2.0*float::consts::PI*(k as Float))/3.0).cos() - shift).collect()
        },
        _ => {
            let u = (-q*0.5).cbrt();
            vec![2.0*u - shift, -u - shift]
        }
    };

    roots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    roots.dedup_by(|a, b| (*a - *b).abs() < ROOT_MERGE_EPS);
    roots
}

/**
 * Coefficients (c3,c2,c1,c0) of det(a*D + B) as a polynomial in a.
 * Each coefficient collects the determinants with the matching number of columns taken from D.
 */
#[allow(non_snake_case)]
pub fn determinant_polynomial(D: &Matrix3<Float>, B: &Matrix3<Float>) -> [Float; 4] {
    let det_cols = |c0: Vector3<Float>, c1: Vector3<Float>, c2: Vector3<Float>| Matrix3::<Float>::from_columns(&[c0,c1,c2]).determinant();
    let d = |i: usize| D.column(i).into_owned();
    let b = |i: usize| B.column(i).into_owned();

    let c3 = D.determinant();
    let c2 = det_cols(d(0),d(1),b(2)) + det_cols(d(0),b(1),d(2)) + det_cols(b(0),d(1),d(2));
    let c1 = det_cols(d(0),b(1),b(2)) + det_cols(b(0),d(1),b(2)) + det_cols(b(0),b(1),d(2));
    let c0 = B.determinant();
    [c3,c2,c1,c0]
}

/**
 * Basis of the (approximate) right null space of A, taken from the right singular vectors
 * belonging to the `dimension` smallest singular values. The vectors are ordered by descending singular value.
 * Systems with fewer rows than columns are padded with zero rows so that V is complete.
 */
#[allow(non_snake_case)]
pub fn null_space(A: &DMatrix<Float>, dimension: usize) -> Result<Vec<DVector<Float>>, GeometryError> {
    let (rows, cols) = A.shape();
    if dimension == 0 || dimension > cols {
        return Err(GeometryError::Degenerate("null space dimension out of range"));
    }

    let padded = match rows < cols {
        true => {
            let mut padded = DMatrix::<Float>::zeros(cols, cols);
            padded.view_mut((0,0),(rows,cols)).copy_from(A);
            padded
        },
        false => A.clone()
    };

    let svd = padded.svd(false,true);
    let singular_values = svd.singular_values.clone();
    let v_t = svd.v_t.ok_or(GeometryError::DecompositionFailed("null space svd"))?;
    let mut order = (0..singular_values.len()).collect::<Vec<usize>>();
    order.sort_by(|&a, &b| singular_values[b].partial_cmp(&singular_values[a]).unwrap_or(std::cmp::Ordering::Equal));

    Ok(order[cols-dimension..].iter().map(|&i| v_t.row(i).transpose()).collect())
}

/**
 * Unit vector x minimizing |A*x|.
 */
#[allow(non_snake_case)]
pub fn right_null_vector(A: &DMatrix<Float>) -> Result<DVector<Float>, GeometryError> {
    null_space(A, 1)?.pop().ok_or(GeometryError::DecompositionFailed("null space is empty"))
}

/**
 * Unit vector x minimizing |M*x| for a 3x3 matrix.
 */
#[allow(non_snake_case)]
pub fn right_null_vector3(M: &Matrix3<Float>) -> Result<Vector3<Float>, GeometryError> {
    let svd = M.svd(false,true);
    let v_t = svd.v_t.ok_or(GeometryError::DecompositionFailed("3x3 svd"))?;
    let min_idx = svd.singular_values.imin();
    Ok(v_t.row(min_idx).transpose())
}

/**
 * Unit vector x minimizing |x^T*M|.
 */
#[allow(non_snake_case)]
pub fn left_null_vector3(M: &Matrix3<Float>) -> Result<Vector3<Float>, GeometryError> {
    right_null_vector3(&M.transpose())
}

/**
 * Rotates the entries of a matrix by 180 degrees: out(r,c) = m(2-r,2-c).
 */
pub fn rotate_entries_180(m: &Matrix3<Float>) -> Matrix3<Float> {
    Matrix3::<Float>::from_fn(|r,c| m[(2-r,2-c)])
}

pub fn dehomogenize(v: &Vector3<Float>, eps: Float) -> Option<na::Vector2<Float>> {
    match v[2] {
        z if z.abs() > eps => Some(na::Vector2::<Float>::new(v[0]/z, v[1]/z)),
        _ => None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cubic_with_three_roots() {
        // (x-1)(x-2)(x+3) = x^3 - 7x + 6
        let roots = solve_cubic(1.0, 0.0, -7.0, 6.0);
        assert_eq!(roots.len(), 3);
        assert_relative_eq!(roots[0], -3.0, epsilon = 1e-9);
        assert_relative_eq!(roots[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(roots[2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn cubic_with_one_root() {
        // (x-2)(x^2+1)
        let roots = solve_cubic(2.0, -4.0, 2.0, -4.0);
        assert_eq!(roots.len(), 1);
        assert_relative_eq!(roots[0], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn cubic_with_double_root() {
        // (x-1)^2(x+2) = x^3 - 3x + 2
        let roots = solve_cubic(1.0, 0.0, -3.0, 2.0);
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], -2.0, epsilon = 1e-6);
        assert_relative_eq!(roots[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_cubic_falls_back_to_quadratic() {
        let roots = solve_cubic(0.0, 1.0, -3.0, 2.0);
        assert_eq!(roots, vec![1.0, 2.0]);
    }

    #[test]
    fn determinant_polynomial_matches_direct_evaluation() {
        let d = Matrix3::<Float>::new(0.3, -1.2, 0.5, 2.0, 0.1, -0.7, 1.1, 0.4, 0.9);
        let b = Matrix3::<Float>::new(-0.5, 0.8, 1.3, 0.2, -1.9, 0.6, 0.7, 0.05, -0.3);
        let [c3,c2,c1,c0] = determinant_polynomial(&d, &b);
        for &a in &[-2.0, -0.3, 0.0, 0.7, 1.5] {
            let direct = (d*a + b).determinant();
            assert_relative_eq!(c3*a*a*a + c2*a*a + c1*a + c0, direct, epsilon = 1e-10);
        }
    }

    #[test]
    fn null_space_of_wide_system() {
        let a = DMatrix::<Float>::from_row_slice(2, 4, &[
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0
        ]);
        let basis = null_space(&a, 2).unwrap();
        assert_eq!(basis.len(), 2);
        for v in &basis {
            assert_relative_eq!((&a*v).norm(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn null_space_of_square_system_is_smallest_singular_vector() {
        let a = DMatrix::<Float>::from_row_slice(3, 3, &[
            3.0, 0.0, 0.0,
            0.0, 0.001, 0.0,
            0.0, 0.0, 2.0
        ]);
        let v = right_null_vector(&a).unwrap();
        assert_relative_eq!(v[1].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn null_space_dimension_out_of_range() {
        let a = DMatrix::<Float>::identity(3, 3);
        assert!(matches!(null_space(&a, 0), Err(GeometryError::Degenerate(_))));
        assert!(matches!(null_space(&a, 4), Err(GeometryError::Degenerate(_))));
    }

    #[test]
    fn rotate_entries() {
        let m = Matrix3::<Float>::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        assert_eq!(rotate_entries_180(&m), Matrix3::<Float>::new(9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0));
    }
}
