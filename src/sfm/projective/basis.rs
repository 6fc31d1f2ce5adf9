extern crate nalgebra as na;

use na::{Matrix3, Vector2, Vector3};

use crate::{Float, GeometryError};

/**
 * Transform T mapping the four image points onto the canonical projective basis
 * (1,0,0), (0,1,0), (0,0,1) and (1,1,1), each up to scale.
 * Multiple View Geometry p.511
 */
#[allow(non_snake_case)]
pub fn calculate_projective_basis_transform(point_100: &Vector2<Float>, point_010: &Vector2<Float>, point_001: &Vector2<Float>, point_111: &Vector2<Float>) -> Result<Matrix3<Float>, GeometryError> {
    let H = Matrix3::<Float>::from_columns(&[point_100.push(1.0), point_010.push(1.0), point_001.push(1.0)]);
    let H_inv = H.try_inverse().ok_or(GeometryError::SingularMatrix("first three basis points are collinear"))?;

    let scale = H_inv*point_111.push(1.0);
    (H*Matrix3::<Float>::from_diagonal(&scale)).try_inverse().ok_or(GeometryError::SingularMatrix("fourth basis point is collinear"))
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub a: Vector2<Float>,
    pub b: Vector2<Float>,
    pub c: Vector2<Float>
}

impl Triangle {
    pub fn new(a: Vector2<Float>, b: Vector2<Float>, c: Vector2<Float>) -> Triangle {
        Triangle { a, b, c }
    }

    fn denominator(&self) -> Float {
        (self.b[1] - self.c[1])*(self.a[0] - self.c[0]) + (self.c[0] - self.b[0])*(self.a[1] - self.c[1])
    }

    /**
     * A triangle is valid if its corners are not collinear.
     */
    pub fn is_valid(&self, eps: Float) -> bool {
        self.denominator().abs() > eps
    }

    pub fn cartesian_to_barycentric(&self, point: &Vector2<Float>) -> Vector3<Float> {
        let d = self.denominator();
        let l1 = ((self.b[1] - self.c[1])*(point[0] - self.c[0]) + (self.c[0] - self.b[0])*(point[1] - self.c[1]))/d;
        let l2 = ((self.c[1] - self.a[1])*(point[0] - self.c[0]) + (self.a[0] - self.c[0])*(point[1] - self.c[1]))/d;
        Vector3::<Float>::new(l1, l2, 1.0 - l1 - l2)
    }
}

/**
 * True if the point is close to one of the lines through two corners of the triangle,
 * i.e. one of its barycentric coordinates is below the threshold.
 */
pub fn point_is_collinear(triangle: &Triangle, point: &Vector2<Float>, threshold: Float) -> bool {
    triangle.cartesian_to_barycentric(point).iter().any(|l| l.abs() < threshold)
}
