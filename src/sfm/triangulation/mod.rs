extern crate nalgebra as na;

use na::{DMatrix, Matrix3x4, Matrix4, Vector2, Vector3, Vector4};
use log::debug;

use crate::{Float, GeometryConfig, GeometryError};
use crate::error::check_correspondences;
use crate::numerics::right_null_vector;
use crate::numerics::pose::{projection_block, standard_to_inverted_flipped};
use crate::sensors::camera::Camera;

/**
 * Triangulated object points. Points that could not be triangulated (or lie behind a camera when
 * only front points were requested) hold the caller's invalid value and their indices are listed.
 */
#[derive(Debug, Clone)]
pub struct TriangulatedPoints {
    pub object_points: Vec<Vector3<Float>>,
    pub invalid_indices: Vec<usize>
}

impl TriangulatedPoints {
    pub fn valid_count(&self) -> usize {
        self.object_points.len() - self.invalid_indices.len()
    }
}

/**
 * Linear Triangulation (DLT) of a single point observed in several views. Returns the homogeneous
 * solution with unit norm. Triangulation by Hartley et al.
 */
#[allow(non_snake_case)]
pub fn linear_triangulation_svd(projections: &[Matrix3x4<Float>], image_points: &[Vector2<Float>]) -> Result<Vector4<Float>, GeometryError> {
    if projections.len() != image_points.len() {
        return Err(GeometryError::MismatchedCorrespondences);
    }
    let n_cams = projections.len();
    if n_cams < 2 {
        return Err(GeometryError::InsufficientViews { required: 2, provided: n_cams });
    }

    let mut A = DMatrix::<Float>::zeros(2*n_cams, 4);
    for (j, (projection, point)) in projections.iter().zip(image_points.iter()).enumerate() {
        let u = point[0];
        let v = point[1];
        A.row_mut(2*j).copy_from(&(u*projection.row(2) - projection.row(0)));
        A.row_mut(2*j+1).copy_from(&(v*projection.row(2) - projection.row(1)));
    }

    let p = right_null_vector(&A)?;
    Ok(Vector4::<Float>::new(p[0], p[1], p[2], p[3]))
}

fn dehomogenize_object_point(p: &Vector4<Float>, eps: Float) -> Option<Vector3<Float>> {
    match p[3] {
        w if w.abs() > eps => Some(Vector3::<Float>::new(p[0]/w, p[1]/w, p[2]/w)),
        _ => None
    }
}

/**
 * Two view triangulation with inverted flipped poses (flippedCamera_T_world).
 */
#[allow(non_snake_case)]
pub fn triangulate_image_points_if<C: Camera>(
    camera_left: &C, flippedLeft_T_world: &Matrix4<Float>,
    camera_right: &C, flippedRight_T_world: &Matrix4<Float>,
    left_points: &[Vector2<Float>], right_points: &[Vector2<Float>],
    invalid_object_point: &Vector3<Float>, only_front_object_points: bool, config: &GeometryConfig) -> Result<TriangulatedPoints, GeometryError> {
    check_correspondences(&[left_points.len(), right_points.len()], 0)?;

    let cameras: [&dyn Camera; 2] = [camera_left, camera_right];
    let poses = [*flippedLeft_T_world, *flippedRight_T_world];
    let image_points = [left_points.to_vec(), right_points.to_vec()];
    triangulate_views_if(&poses, &image_points, Some(&cameras[..]), invalid_object_point, only_front_object_points, config)
}

/**
 * Two view triangulation with standard poses (world_T_camera).
 */
#[allow(non_snake_case)]
pub fn triangulate_image_points<C: Camera>(
    camera_left: &C, world_T_left: &Matrix4<Float>,
    camera_right: &C, world_T_right: &Matrix4<Float>,
    left_points: &[Vector2<Float>], right_points: &[Vector2<Float>],
    invalid_object_point: &Vector3<Float>, only_front_object_points: bool, config: &GeometryConfig) -> Result<TriangulatedPoints, GeometryError> {
    triangulate_image_points_if(
        camera_left, &standard_to_inverted_flipped(world_T_left),
        camera_right, &standard_to_inverted_flipped(world_T_right),
        left_points, right_points, invalid_object_point, only_front_object_points, config)
}

/**
 * Multi view triangulation with inverted flipped poses, one image point sequence per pose.
 * Without a camera the upper 3x4 block of each pose is used as the projection matrix directly and
 * the front test checks the sign of the projective depth.
 */
pub fn triangulate_image_points_multi_view_if(
    poses_if: &[Matrix4<Float>], image_points: &[Vec<Vector2<Float>>], camera: Option<&dyn Camera>,
    invalid_object_point: &Vector3<Float>, only_front_object_points: bool, config: &GeometryConfig) -> Result<TriangulatedPoints, GeometryError> {
    match camera {
        Some(camera) => {
            let cameras = vec![camera; poses_if.len()];
            triangulate_views_if(poses_if, image_points, Some(&cameras[..]), invalid_object_point, only_front_object_points, config)
        },
        None => triangulate_views_if(poses_if, image_points, None, invalid_object_point, only_front_object_points, config)
    }
}

fn triangulate_views_if(
    poses_if: &[Matrix4<Float>], image_points: &[Vec<Vector2<Float>>], cameras: Option<&[&dyn Camera]>,
    invalid_object_point: &Vector3<Float>, only_front_object_points: bool, config: &GeometryConfig) -> Result<TriangulatedPoints, GeometryError> {
    if poses_if.len() != image_points.len() {
        return Err(GeometryError::MismatchedCorrespondences);
    }
    if poses_if.len() < 2 {
        return Err(GeometryError::InsufficientViews { required: 2, provided: poses_if.len() });
    }
    let number_of_points = check_correspondences(&image_points.iter().map(|p| p.len()).collect::<Vec<usize>>(), 0)?;

    let projections = poses_if.iter().enumerate().map(|(i, pose)| match cameras {
        Some(cameras) => cameras[i].projection_matrix_if(pose),
        None => projection_block(pose)
    }).collect::<Vec<Matrix3x4<Float>>>();

    let mut object_points = Vec::<Vector3<Float>>::with_capacity(number_of_points);
    let mut invalid_indices = Vec::<usize>::new();
    let mut observations = Vec::<Vector2<Float>>::with_capacity(poses_if.len());

    for i in 0..number_of_points {
        observations.clear();
        observations.extend(image_points.iter().map(|points| points[i]));

        let homogeneous = linear_triangulation_svd(&projections, &observations)?;
        let object_point = dehomogenize_object_point(&homogeneous, config.eps).filter(|x| {
            !only_front_object_points || match cameras {
                Some(_) => poses_if.iter().all(|pose| (pose*x.push(1.0))[2] > 0.0),
                None => projections.iter().all(|projection| (projection*x.push(1.0))[2] > 0.0)
            }
        });

        match object_point {
            Some(x) => object_points.push(x),
            None => {
                object_points.push(*invalid_object_point);
                invalid_indices.push(i);
            }
        }
    }

    if !invalid_indices.is_empty() {
        debug!("triangulation: {} of {} points invalid", invalid_indices.len(), number_of_points);
    }

    Ok(TriangulatedPoints { object_points, invalid_indices })
}
