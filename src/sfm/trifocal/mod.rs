extern crate nalgebra as na;

pub mod estimation;

use na::{Matrix3, Matrix3x4, Matrix4, Vector2, Vector3};

use crate::{Float, GeometryConfig, GeometryError};
use crate::error::check_correspondences;

pub use estimation::{trifocal_tensor_linear, trifocal_tensor_normalized_linear, trifocal_tensor_minimizing_error};

/**
 * Three 3x3 slices T_i. For corresponding points x1, x2, x3 the incidence relation
 * [x2]x * (sum_i x1[i]*T_i) * [x3]x = 0 holds. Rows of a slice refer to the second view, columns to the third.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrifocalTensor {
    pub slices: [Matrix3<Float>; 3]
}

impl TrifocalTensor {
    /**
     * Reads 27 values where T_i(j,k) = t[9i + 3j + k].
     */
    pub fn from_vector(t: &[Float]) -> Result<TrifocalTensor, GeometryError> {
        match t.len() {
            27 => Ok(TrifocalTensor {
                slices: [0, 1, 2].map(|i| Matrix3::<Float>::from_fn(|j, k| t[9*i + 3*j + k]))
            }),
            n => Err(GeometryError::InvalidLength { expected: 27, provided: n })
        }
    }

    pub fn to_vector(&self) -> Vec<Float> {
        let mut t = Vec::<Float>::with_capacity(27);
        for slice in self.slices.iter() {
            for j in 0..3 {
                for k in 0..3 {
                    t.push(slice[(j, k)]);
                }
            }
        }
        t
    }

    /**
     * sum_i x[i]*T_i
     */
    pub fn contract(&self, x: &Vector3<Float>) -> Matrix3<Float> {
        self.slices[0]*x[0] + self.slices[1]*x[1] + self.slices[2]*x[2]
    }

    pub fn norm(&self) -> Float {
        self.slices.iter().map(|s| s.norm_squared()).sum::<Float>().sqrt()
    }

    pub fn normalized(&self) -> TrifocalTensor {
        let norm = self.norm();
        TrifocalTensor { slices: self.slices.map(|s| s/norm) }
    }
}

/**
 * Tensor for the canonical cameras P1 = [I|0], P2 = [B|b4] and P3 = [C|c4]:
 * T_i = b_i * c4^T - b4 * c_i^T
 * Multiple View Geometry alg. 15.1 p.367
 */
#[allow(non_snake_case)]
pub fn trifocal_tensor_from_projection_matrices_2(P2: &Matrix3x4<Float>, P3: &Matrix3x4<Float>) -> TrifocalTensor {
    TrifocalTensor {
        slices: [0, 1, 2].map(|i| Matrix3::<Float>::from_fn(|j, k| P2[(j, i)]*P3[(k, 3)] - P2[(j, 3)]*P3[(k, i)]))
    }
}

/**
 * Tensor for three general cameras.
 * T_i(q,r) = (-1)^(i+1) det [P1 without row i; P2 row q; P3 row r]
 * Multiple View Geometry eq. 17.12 p.412
 */
#[allow(non_snake_case)]
pub fn trifocal_tensor_from_projection_matrices_3(P1: &Matrix3x4<Float>, P2: &Matrix3x4<Float>, P3: &Matrix3x4<Float>) -> TrifocalTensor {
    let slices = [0, 1, 2].map(|i| {
        let kept_rows = match i {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1]
        };
        let sign = match i {
            1 => -1.0,
            _ => 1.0
        };

        Matrix3::<Float>::from_fn(|q, r| {
            let mut m = Matrix4::<Float>::zeros();
            m.row_mut(0).copy_from(&P1.row(kept_rows[0]));
            m.row_mut(1).copy_from(&P1.row(kept_rows[1]));
            m.row_mut(2).copy_from(&P2.row(q));
            m.row_mut(3).copy_from(&P3.row(r));
            sign*m.determinant()
        })
    });

    TrifocalTensor { slices }
}

fn common_null_vectors(tensor: &TrifocalTensor) -> Result<(Vector3<Float>, Vector3<Float>), GeometryError> {
    let mut left_null_vectors = Matrix3::<Float>::zeros();
    let mut right_null_vectors = Matrix3::<Float>::zeros();

    for (i, slice) in tensor.slices.iter().enumerate() {
        let svd = slice.svd(true, true);
        let u = svd.u.ok_or(GeometryError::DecompositionFailed("trifocal slice svd"))?;
        let v_t = svd.v_t.ok_or(GeometryError::DecompositionFailed("trifocal slice svd"))?;
        let min_idx = svd.singular_values.imin();
        left_null_vectors.set_column(i, &u.column(min_idx));
        right_null_vectors.set_column(i, &v_t.row(min_idx).transpose());
    }

    // the epipoles are orthogonal to the span of the null vectors
    let e2 = left_null_vectors.qr().q().column(2).into_owned();
    let e3 = right_null_vectors.qr().q().column(2).into_owned();
    Ok((e2, e3))
}

/**
 * Unit epipoles (e2, e3) of the second and third view in the inverted flipped convention.
 * Multiple View Geometry alg. 15.1 p.375
 */
pub fn epipoles_if(tensor: &TrifocalTensor) -> Result<(Vector3<Float>, Vector3<Float>), GeometryError> {
    common_null_vectors(tensor)
}

/**
 * Unit epipoles (e2, e3) in the standard convention. For unit vectors negating x equals flipping y and z.
 */
pub fn epipoles(tensor: &TrifocalTensor) -> Result<(Vector3<Float>, Vector3<Float>), GeometryError> {
    let (mut e2, mut e3) = common_null_vectors(tensor)?;
    e2[0] = -e2[0];
    e3[0] = -e3[0];
    Ok((e2, e3))
}

/**
 * F21 = [e2]x [T1 e3, T2 e3, T3 e3] and F31 = [e3]x [T1^T e2, T2^T e2, T3^T e2]
 */
pub fn fundamental_matrices_if(tensor: &TrifocalTensor, e2: &Vector3<Float>, e3: &Vector3<Float>) -> (Matrix3<Float>, Matrix3<Float>) {
    let e2_cross = e2.cross_matrix();
    let e3_cross = e3.cross_matrix();

    let f21 = Matrix3::<Float>::from_columns(&tensor.slices.map(|s| e2_cross*(s*e3)));
    let f31 = Matrix3::<Float>::from_columns(&tensor.slices.map(|s| e3_cross*(s.transpose()*e2)));
    (f21, f31)
}

/**
 * Cameras (P2, P3) for P1 = [I|0] from the tensor and its unit epipoles.
 * P2 = [[T1 e3, T2 e3, T3 e3] | e2], P3 = [(e3 e3^T - I)[T1^T e2, T2^T e2, T3^T e2] | e3]
 */
#[allow(non_snake_case)]
pub fn camera_projection_matrices_if(tensor: &TrifocalTensor, e2: &Vector3<Float>, e3: &Vector3<Float>) -> (Matrix3x4<Float>, Matrix3x4<Float>) {
    let e3e3t = e3*e3.transpose() - Matrix3::<Float>::identity();

    let mut P2 = Matrix3x4::<Float>::zeros();
    let mut P3 = Matrix3x4::<Float>::zeros();
    for (i, slice) in tensor.slices.iter().enumerate() {
        P2.set_column(i, &(slice*e3));
        P3.set_column(i, &(e3e3t*(slice.transpose()*e2)));
    }
    P2.set_column(3, e2);
    P3.set_column(3, e3);
    (P2, P3)
}

/**
 * Projective cameras of three views from point correspondences.
 */
#[derive(Debug, Clone)]
pub struct TrifocalReconstruction {
    pub tensor: TrifocalTensor,
    pub projection_matrices: [Matrix3x4<Float>; 3]
}

#[allow(non_snake_case)]
pub fn trifocal_tensor_if(points1: &[Vector2<Float>], points2: &[Vector2<Float>], points3: &[Vector2<Float>], config: &GeometryConfig) -> Result<TrifocalReconstruction, GeometryError> {
    let tensor = trifocal_tensor_normalized_linear(points1, points2, points3, config)?;
    let (e2, e3) = epipoles_if(&tensor)?;
    let (P2, P3) = camera_projection_matrices_if(&tensor, &e2, &e3);
    Ok(TrifocalReconstruction { tensor, projection_matrices: [Matrix3x4::<Float>::identity(), P2, P3] })
}

/**
 * Returns the mean absolute incidence residual and the mean residual matrix [x2]x (sum_i x1[i]*T_i) [x3]x.
 */
pub fn error_matrix(tensor: &TrifocalTensor, points1: &[Vector2<Float>], points2: &[Vector2<Float>], points3: &[Vector2<Float>]) -> Result<(Float, Matrix3<Float>), GeometryError> {
    let correspondences = check_correspondences(&[points1.len(), points2.len(), points3.len()], 1)?;

    let mut abs_error = 0.0;
    let mut error = Matrix3::<Float>::zeros();
    for ((p1, p2), p3) in points1.iter().zip(points2.iter()).zip(points3.iter()) {
        let m = tensor.contract(&p1.push(1.0));
        let residual = p2.push(1.0).cross_matrix()*m*p3.push(1.0).cross_matrix();
        abs_error += residual.abs().sum();
        error += residual;
    }

    let n = correspondences as Float;
    Ok((abs_error/n, error/n))
}
