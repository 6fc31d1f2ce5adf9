extern crate nalgebra as na;

use na::{Matrix3, Vector2};
use crate::{Float, float};

const VARIANCE_EPS: Float = 1e-12;

/**
 * Conditions image points for linear solvers: the centroid is moved to the origin and the
 * points are scaled so that their root mean square distance to the origin is sqrt(2).
 * The points are transformed in place. Returns (normalization, inverse normalization).
 * Empty or coincident point sets leave the points untouched and return the identity.
 * Multiple View Geometry p.109
 */
pub fn calculate_normalized_points(points: &mut [Vector2<Float>]) -> (Matrix3<Float>, Matrix3<Float>) {
    if points.is_empty() {
        return (Matrix3::<Float>::identity(), Matrix3::<Float>::identity());
    }

    let n = points.len() as Float;
    let centroid = points.iter().fold(Vector2::<Float>::zeros(), |acc, p| acc + p)/n;
    let mean_squared_distance = points.iter().map(|p| (p - centroid).norm_squared()).sum::<Float>()/n;

    if mean_squared_distance < VARIANCE_EPS {
        return (Matrix3::<Float>::identity(), Matrix3::<Float>::identity());
    }

    let scale = float::consts::SQRT_2/mean_squared_distance.sqrt();
    for p in points.iter_mut() {
        *p = (*p - centroid)*scale;
    }

    let normalization = Matrix3::<Float>::new(
        scale, 0.0, -scale*centroid[0],
        0.0, scale, -scale*centroid[1],
        0.0, 0.0, 1.0);
    let inverse_normalization = Matrix3::<Float>::new(
        1.0/scale, 0.0, centroid[0],
        0.0, 1.0/scale, centroid[1],
        0.0, 0.0, 1.0);

    (normalization, inverse_normalization)
}

/**
 * Copying variant of calculate_normalized_points.
 */
pub fn normalized_points(points: &[Vector2<Float>]) -> (Vec<Vector2<Float>>, Matrix3<Float>, Matrix3<Float>) {
    let mut normalized = points.to_vec();
    let (normalization, inverse_normalization) = calculate_normalized_points(&mut normalized);
    (normalized, normalization, inverse_normalization)
}
