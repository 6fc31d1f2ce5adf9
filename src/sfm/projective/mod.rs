extern crate nalgebra as na;

pub mod basis;

use std::collections::BTreeSet;
use na::{DMatrix, Matrix3, Matrix3x4, Matrix4, Vector2, Vector3, Vector4};
use rand::Rng;
use rand::seq::index::sample;
use log::{debug, trace};

use crate::{Float, GeometryConfig, GeometryError};
use crate::error::check_correspondences;
use crate::numerics::{determinant_polynomial, null_space, right_null_vector, right_null_vector3, left_null_vector3, solve_cubic};
use basis::{Triangle, calculate_projective_basis_transform, point_is_collinear};

/**
 * Projective cameras and the six canonical object points they were estimated from.
 * indices refers to the correspondences used for the object points, in the same order.
 */
#[derive(Debug, Clone)]
pub struct ProjectiveReconstruction {
    pub projection_matrices: Vec<Matrix3x4<Float>>,
    pub object_points: [Vector4<Float>; 6],
    pub indices: [usize; 6],
    pub squared_error: Float
}

/**
 * Coefficients (c3,c2,c1,c0) of det(a*F1 + (1-a)*F2).
 */
#[allow(non_snake_case)]
pub fn dual_fundamental_cubic(F1: &Matrix3<Float>, F2: &Matrix3<Float>) -> [Float; 4] {
    determinant_polynomial(&(F1 - F2), F2)
}

/**
 * Dual fundamental matrix with zero diagonal whose entries sum to zero:
 * [[0,p,q],[r,0,s],[t,-(p+q+r+s+t),0]]
 */
pub fn dual_fundamental_from_vector(f: &[Float]) -> Result<Matrix3<Float>, GeometryError> {
    let (p, q, r, s, t) = match f {
        &[p, q, r, s, t] => (p, q, r, s, t),
        _ => return Err(GeometryError::InvalidLength { expected: 5, provided: f.len() })
    };
    let sum = -(p + q + r + s + t);
    Ok(Matrix3::<Float>::new(
        0.0, p, q,
        r, 0.0, s,
        t, sum, 0.0))
}

/**
 * Row of the linear system x2^T * F * x1 = 0 for the parameters (p,q,r,s,t) of a dual fundamental matrix.
 */
fn dual_fundamental_coefficients(x1: &Vector3<Float>, x2: &Vector3<Float>) -> [Float; 5] {
    let y1z2 = x1[1]*x2[2];
    [
        x1[1]*x2[0] - y1z2,
        x1[2]*x2[0] - y1z2,
        x1[0]*x2[1] - y1z2,
        x1[2]*x2[1] - y1z2,
        x1[0]*x2[2] - y1z2
    ]
}

/**
 * Picks six correspondences: three forming a valid triangle in every view, a fourth that is not collinear
 * with the triangle in any view and the first two remaining correspondences.
 * The first four indices are sorted.
 */
fn select_six_points<R: Rng + ?Sized>(image_points_per_view: &[&[Vector2<Float>]], correspondences: usize, rng: &mut R, config: &GeometryConfig) -> Result<[usize; 6], GeometryError> {
    let mut sampled = None;
    for attempt in 0..config.max_sampling_iterations {
        let indices = sample(&mut *rng, correspondences, 3).into_iter().collect::<BTreeSet<usize>>();
        let corners = indices.iter().copied().collect::<Vec<usize>>();
        let triangles = image_points_per_view.iter()
            .map(|points| Triangle::new(points[corners[0]], points[corners[1]], points[corners[2]]))
            .collect::<Vec<Triangle>>();

        if triangles.iter().all(|triangle| triangle.is_valid(config.eps)) {
            sampled = Some((indices, triangles));
            break;
        }
        trace!("select_six_points: degenerate triangle, attempt {}", attempt + 1);
    }
    let (mut basis_indices, triangles) = sampled.ok_or(GeometryError::Degenerate("no valid triangle found in all views"))?;

    let fourth = (0..correspondences).find(|&i| {
        image_points_per_view.iter().zip(triangles.iter())
            .all(|(points, triangle)| !point_is_collinear(triangle, &points[i], config.collinearity_threshold))
    }).ok_or(GeometryError::Degenerate("every candidate point is collinear with the triangle"))?;
    basis_indices.insert(fourth);

    let remaining = (0..correspondences).filter(|i| !basis_indices.contains(i)).take(2).collect::<Vec<usize>>();
    if remaining.len() != 2 {
        return Err(GeometryError::InsufficientCorrespondences { required: 6, provided: correspondences });
    }

    let mut index6 = [0usize; 6];
    for (slot, index) in basis_indices.iter().chain(remaining.iter()).enumerate() {
        index6[slot] = *index;
    }
    Ok(index6)
}

/**
 * Projective reconstruction from six correspondences in N >= 3 views.
 * For three views the dual fundamental matrix is found from a two dimensional null space and a cubic constraint,
 * for more views the linear system has a unique solution.
 * Succeeds if the mean squared reprojection error of the six points is below config.squared_success_threshold.
 * Multiple View Geometry alg. 20.1 p.511
 */
#[allow(non_snake_case)]
pub fn projective_reconstruction_from_6_points_if<R: Rng + ?Sized>(image_points_per_view: &[&[Vector2<Float>]], rng: &mut R, config: &GeometryConfig) -> Result<ProjectiveReconstruction, GeometryError> {
    let views = image_points_per_view.len();
    if views < 3 {
        return Err(GeometryError::InsufficientViews { required: 3, provided: views });
    }
    let correspondences = check_correspondences(
        &image_points_per_view.iter().map(|points| points.len()).collect::<Vec<usize>>(),
        config.min_reconstruction_correspondences.max(6))?;

    let index6 = select_six_points(image_points_per_view, correspondences, rng, config)?;

    let mut A = DMatrix::<Float>::zeros(views, 5);
    for (v, points) in image_points_per_view.iter().enumerate() {
        let T = calculate_projective_basis_transform(&points[index6[0]], &points[index6[1]], &points[index6[2]], &points[index6[3]])?;
        let x1 = T*points[index6[4]].push(1.0);
        let x2 = T*points[index6[5]].push(1.0);
        for (c, value) in dual_fundamental_coefficients(&x1, &x2).iter().enumerate() {
            A[(v, c)] = *value;
        }
    }

    let candidates = match views {
        3 => {
            let basis = null_space(&A, 2)?;
            let F1 = dual_fundamental_from_vector(basis[0].as_slice())?;
            let F2 = dual_fundamental_from_vector(basis[1].as_slice())?;

            let [c3, c2, c1, c0] = dual_fundamental_cubic(&F1, &F2);
            let roots = solve_cubic(c3, c2, c1, c0);
            if roots.is_empty() || roots.len() == 2 {
                return Err(GeometryError::InvalidRootCount(roots.len()));
            }

            let number_of_roots = roots.len();
            roots.into_iter()
                .map(|a| F1*a + F2*(1.0 - a))
                .filter(|F| {
                    let keep = number_of_roots == 1 || has_rank_two(F, config);
                    if !keep {
                        debug!("projective reconstruction: skipping root without rank two");
                    }
                    keep
                })
                .collect::<Vec<Matrix3<Float>>>()
        },
        _ => vec![dual_fundamental_from_vector(right_null_vector(&A)?.as_slice())?]
    };

    let mut best: Option<(Float, Vec<Matrix3x4<Float>>, [Vector4<Float>; 6])> = None;
    for F in candidates.iter() {
        match reconstruct_from_dual_fundamental(F, image_points_per_view, &index6) {
            Ok((projection_matrices, object_points)) => {
                let error = squared_reprojection_error(&projection_matrices, &object_points, image_points_per_view, &index6, config);
                trace!("projective reconstruction: candidate error {}", error);
                if best.as_ref().map_or(true, |(best_error, _, _)| error < *best_error) {
                    best = Some((error, projection_matrices, object_points));
                }
            },
            Err(e) => debug!("projective reconstruction: candidate rejected, {}", e)
        }
    }

    let (best_error, projection_matrices, object_points) = best.ok_or(GeometryError::Degenerate("no candidate reconstruction"))?;
    let samples = (6*views) as Float;
    let squared_error = best_error/samples;

    match best_error < config.squared_success_threshold*samples {
        true => Ok(ProjectiveReconstruction { projection_matrices, object_points, indices: index6, squared_error }),
        false => Err(GeometryError::ReprojectionErrorTooLarge { squared_error, threshold: config.squared_success_threshold })
    }
}

/**
 * Three view version of projective_reconstruction_from_6_points_if.
 */
pub fn projective_reconstruction_from_6_points_3_views_if<R: Rng + ?Sized>(points1: &[Vector2<Float>], points2: &[Vector2<Float>], points3: &[Vector2<Float>], rng: &mut R, config: &GeometryConfig) -> Result<ProjectiveReconstruction, GeometryError> {
    projective_reconstruction_from_6_points_if(&[points1, points2, points3], rng, config)
}

#[allow(non_snake_case)]
fn has_rank_two(F: &Matrix3<Float>, config: &GeometryConfig) -> bool {
    let mut singular_values = F.singular_values().as_slice().to_vec();
    singular_values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    singular_values[0] > config.eps && singular_values[1] > config.weak_eps*singular_values[0]
}

/**
 * Recovers the sixth object point from the dual fundamental matrix and solves each camera by DLT.
 */
#[allow(non_snake_case)]
fn reconstruct_from_dual_fundamental(F: &Matrix3<Float>, image_points_per_view: &[&[Vector2<Float>]], index6: &[usize; 6]) -> Result<(Vec<Matrix3x4<Float>>, [Vector4<Float>; 6]), GeometryError> {
    // ratio a:b:c
    let reordered = Matrix3::<Float>::new(
        F[(0,1)], F[(1,0)], 0.0,
        F[(0,2)], 0.0, F[(2,0)],
        0.0, F[(1,2)], F[(2,1)]);
    let abc = right_null_vector3(&reordered)?;
    let (a, b, c) = (abc[0], abc[1], abc[2]);

    // ratio (d-a):(d-b):(d-c)
    let d = left_null_vector3(F)?;
    let (da, db, dc) = (d[0], d[1], d[2]);

    let M = DMatrix::<Float>::from_row_slice(6, 4, &[
        0.0, -c, b, 0.0,
        c, 0.0, -a, 0.0,
        -b, a, 0.0, 0.0,
        db, -da, 0.0, da - db,
        0.0, dc, -db, db - dc,
        -dc, 0.0, da, dc - da
    ]);
    let x6 = right_null_vector(&M)?;

    let object_points = [
        Vector4::<Float>::new(1.0, 0.0, 0.0, 0.0),
        Vector4::<Float>::new(0.0, 1.0, 0.0, 0.0),
        Vector4::<Float>::new(0.0, 0.0, 1.0, 0.0),
        Vector4::<Float>::new(0.0, 0.0, 0.0, 1.0),
        Vector4::<Float>::new(1.0, 1.0, 1.0, 1.0),
        Vector4::<Float>::new(x6[0], x6[1], x6[2], x6[3])
    ];

    let projection_matrices = image_points_per_view.iter()
        .map(|points| camera_from_six_points(&object_points, points, index6))
        .collect::<Result<Vec<Matrix3x4<Float>>, GeometryError>>()?;

    Ok((projection_matrices, object_points))
}

/**
 * DLT for a 3x4 camera from six object/image point pairs.
 */
#[allow(non_snake_case)]
fn camera_from_six_points(object_points: &[Vector4<Float>; 6], points: &[Vector2<Float>], index6: &[usize; 6]) -> Result<Matrix3x4<Float>, GeometryError> {
    let mut A = DMatrix::<Float>::zeros(12, 12);
    for (i, X) in object_points.iter().enumerate() {
        let image_point = &points[index6[i]];
        for c in 0..4 {
            A[(2*i, 4 + c)] = -X[c];
            A[(2*i, 8 + c)] = image_point[1]*X[c];
            A[(2*i + 1, c)] = X[c];
            A[(2*i + 1, 8 + c)] = -image_point[0]*X[c];
        }
    }

    let p = right_null_vector(&A)?;
    Ok(Matrix3x4::<Float>::from_row_slice(p.as_slice()))
}

fn squared_reprojection_error(projection_matrices: &[Matrix3x4<Float>], object_points: &[Vector4<Float>; 6], image_points_per_view: &[&[Vector2<Float>]], index6: &[usize; 6], config: &GeometryConfig) -> Float {
    let mut error = 0.0;
    for (projection, points) in projection_matrices.iter().zip(image_points_per_view.iter()) {
        for (object_point, &index) in object_points.iter().zip(index6.iter()) {
            let projected = projection*object_point;
            match projected[2] {
                z if z.abs() > config.eps => {
                    error += (Vector2::<Float>::new(projected[0]/z, projected[1]/z) - points[index]).norm_squared();
                },
                _ => return Float::MAX
            }
        }
    }
    error
}

/**
 * Embeds the projective cameras as 4x4 matrices with bottom row [0,0,0,1].
 */
pub fn projection_matrices_to_homogeneous(reconstruction: &ProjectiveReconstruction) -> Vec<Matrix4<Float>> {
    reconstruction.projection_matrices.iter().map(crate::numerics::pose::projection_to_homogeneous).collect()
}
