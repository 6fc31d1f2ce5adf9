mod common;

use nalgebra as na;

use na::Vector2;
use vision_geometry::{Float, GeometryConfig, GeometryError};
use vision_geometry::numerics::dehomogenize;
use vision_geometry::sfm::projective::{
    ProjectiveReconstruction, projection_matrices_to_homogeneous, projective_reconstruction_from_6_points_3_views_if,
    projective_reconstruction_from_6_points_if};

fn max_reprojection_error(reconstruction: &ProjectiveReconstruction, image_points: &[Vec<Vector2<Float>>]) -> Float {
    reconstruction.projection_matrices.iter().zip(image_points.iter()).flat_map(|(projection, points)| {
        reconstruction.object_points.iter().zip(reconstruction.indices.iter()).map(move |(object_point, &index)| {
            match dehomogenize(&(projection*object_point), 1e-12) {
                Some(projected) => (projected - points[index]).norm(),
                None => Float::MAX
            }
        })
    }).fold(0.0, Float::max)
}

#[test]
fn three_view_reconstruction_succeeds_on_most_scenes() {
    common::init_logging();
    let config = GeometryConfig::default();
    let trials = 20;

    let successes = (0..trials).filter(|&trial| {
        let scene = common::multi_view_scene(3, 30, 100 + trial);
        let mut rng = common::seeded_rng(trial);
        match projective_reconstruction_from_6_points_3_views_if(&scene.image_points[0], &scene.image_points[1], &scene.image_points[2], &mut rng, &config) {
            Ok(reconstruction) => {
                assert_eq!(reconstruction.projection_matrices.len(), 3);
                assert!(reconstruction.squared_error < config.squared_success_threshold);
                assert!(max_reprojection_error(&reconstruction, &scene.image_points) < 2.5*(6.0 as Float).sqrt()*3.0);
                true
            },
            Err(_) => false
        }
    }).count();

    assert!(successes*2 >= trials as usize, "only {} of {} reconstructions succeeded", successes, trials);
}

#[test]
fn four_view_reconstruction_reprojects_the_six_points() {
    common::init_logging();
    let config = GeometryConfig::default();
    let scene = common::multi_view_scene(4, 30, 41);
    let views = scene.image_points.iter().map(|points| points.as_slice()).collect::<Vec<&[Vector2<Float>]>>();

    let mut rng = common::seeded_rng(41);
    let reconstruction = projective_reconstruction_from_6_points_if(&views, &mut rng, &config).unwrap();
    assert_eq!(reconstruction.projection_matrices.len(), 4);
    assert!(reconstruction.squared_error < 1e-6);
    assert!(max_reprojection_error(&reconstruction, &scene.image_points) < 1e-3);

    let mut indices = reconstruction.indices.to_vec();
    indices.sort_unstable();
    indices.dedup();
    assert_eq!(indices.len(), 6);

    let homogeneous = projection_matrices_to_homogeneous(&reconstruction);
    assert_eq!(homogeneous.len(), 4);
    assert_eq!(homogeneous[2].fixed_view::<3, 4>(0, 0).into_owned(), reconstruction.projection_matrices[2]);
    assert_eq!(homogeneous[2][(3, 3)], 1.0);
}

#[test]
fn reconstruction_needs_three_views_and_six_points() {
    let config = GeometryConfig::default();
    let scene = common::multi_view_scene(3, 10, 42);
    let mut rng = common::seeded_rng(42);

    let two_views = [scene.image_points[0].as_slice(), scene.image_points[1].as_slice()];
    assert!(matches!(
        projective_reconstruction_from_6_points_if(&two_views, &mut rng, &config),
        Err(GeometryError::InsufficientViews { required: 3, provided: 2 })));

    let five_points = scene.image_points.iter().map(|points| &points[..5]).collect::<Vec<&[Vector2<Float>]>>();
    assert!(matches!(
        projective_reconstruction_from_6_points_if(&five_points, &mut rng, &config),
        Err(GeometryError::InsufficientCorrespondences { required: 6, provided: 5 })));
}

#[test]
fn collinear_points_are_rejected() {
    let config = GeometryConfig { max_sampling_iterations: 5, ..GeometryConfig::default() };
    let line = (0..8).map(|i| Vector2::<Float>::new(10.0*(i as Float), 5.0*(i as Float) + 3.0)).collect::<Vec<_>>();
    let mut rng = common::seeded_rng(43);

    assert!(projective_reconstruction_from_6_points_3_views_if(&line, &line, &line, &mut rng, &config).is_err());
}
