use nalgebra as na;
use approx::assert_relative_eq;

use na::{Matrix3, Vector2};
use vision_geometry::Float;
use vision_geometry::sfm::normalization::{calculate_normalized_points, normalized_points};

fn sample_points() -> Vec<Vector2<Float>> {
    vec![
        Vector2::<Float>::new(12.0, 400.0),
        Vector2::<Float>::new(610.0, 33.0),
        Vector2::<Float>::new(320.0, 240.0),
        Vector2::<Float>::new(101.5, 87.25),
        Vector2::<Float>::new(500.0, 470.0)
    ]
}

#[test]
fn normalized_points_are_centered_with_rms_sqrt_2() {
    let (normalized, _, _) = normalized_points(&sample_points());
    let n = normalized.len() as Float;

    let centroid = normalized.iter().fold(Vector2::<Float>::zeros(), |acc, p| acc + p)/n;
    assert_relative_eq!(centroid, Vector2::<Float>::zeros(), epsilon = 1e-12);

    let rms = (normalized.iter().map(|p| p.norm_squared()).sum::<Float>()/n).sqrt();
    assert_relative_eq!(rms, (2.0 as Float).sqrt(), epsilon = 1e-12);
}

#[test]
fn normalization_matrices_map_between_point_sets() {
    let points = sample_points();
    let (normalized, normalization, inverse_normalization) = normalized_points(&points);

    assert_relative_eq!(normalization*inverse_normalization, Matrix3::<Float>::identity(), epsilon = 1e-12);
    for (p, q) in points.iter().zip(normalized.iter()) {
        let mapped = normalization*p.push(1.0);
        assert_relative_eq!(mapped.fixed_rows::<2>(0).into_owned(), *q, epsilon = 1e-12);
        let restored = inverse_normalization*q.push(1.0);
        assert_relative_eq!(restored.fixed_rows::<2>(0).into_owned(), *p, epsilon = 1e-9);
    }
}

#[test]
fn in_place_normalization_matches_copy() {
    let mut points = sample_points();
    let (normalization, _) = calculate_normalized_points(&mut points);
    let (copied, copied_normalization, _) = normalized_points(&sample_points());

    assert_relative_eq!(normalization, copied_normalization);
    assert_eq!(points, copied);
}

#[test]
fn coincident_points_are_left_untouched() {
    let mut points = vec![Vector2::<Float>::new(3.0, 4.0); 4];
    let (normalization, inverse_normalization) = calculate_normalized_points(&mut points);

    assert_eq!(normalization, Matrix3::<Float>::identity());
    assert_eq!(inverse_normalization, Matrix3::<Float>::identity());
    assert_eq!(points[0], Vector2::<Float>::new(3.0, 4.0));

    let mut empty = Vec::<Vector2<Float>>::new();
    assert_eq!(calculate_normalized_points(&mut empty).0, Matrix3::<Float>::identity());
}
