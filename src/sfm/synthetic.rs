extern crate nalgebra as na;

use na::{Matrix3, Matrix4, Rotation3, Unit, Vector2, Vector3, Vector4};
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal, Uniform};
use log::debug;

use crate::{Float, GeometryError};
use crate::numerics::pose::{invert_rigid, se3};
use crate::sensors::camera::Camera;

/**
 * Rotation around a uniformly distributed axis by an angle in [-max_angle, max_angle].
 */
pub fn random_rotation<R: Rng + ?Sized>(max_angle: Float, rng: &mut R) -> Matrix3<Float> {
    let axis = random_unit_vector(rng);
    let angle = match max_angle {
        a if a > 0.0 => Uniform::new_inclusive(-a, a).sample(rng),
        _ => 0.0
    };
    Rotation3::<Float>::from_axis_angle(&axis, angle).into_inner()
}

fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Unit<Vector3<Float>> {
    loop {
        let v = Vector3::<Float>::from_fn(|_, _| StandardNormal.sample(rng));
        if let Some(axis) = Unit::try_new(v, 1e-6) {
            return axis;
        }
    }
}

/**
 * flippedCamera_T_world poses. The first pose is the identity, the others are rotated by at most
 * max_angle and translated by at most max_translation along every axis.
 */
pub fn random_poses_if<R: Rng + ?Sized>(views: usize, max_angle: Float, max_translation: Float, rng: &mut R) -> Vec<Matrix4<Float>> {
    (0..views).map(|v| match v {
        0 => Matrix4::<Float>::identity(),
        _ => {
            let t = match max_translation {
                m if m > 0.0 => {
                    let uniform = Uniform::new_inclusive(-m, m);
                    Vector3::<Float>::new(uniform.sample(rng), uniform.sample(rng), uniform.sample(rng))
                },
                _ => Vector3::<Float>::zeros()
            };
            se3(&t, &random_rotation(max_angle, rng))
        }
    }).collect()
}

/**
 * World points in front of the camera that project into the image with the given border,
 * at depths drawn uniformly from [min_depth, max_depth].
 */
#[allow(non_snake_case)]
pub fn points_in_front<C: Camera, R: Rng + ?Sized>(camera: &C, flippedCamera_T_world: &Matrix4<Float>, count: usize, min_depth: Float, max_depth: Float, border: Float, rng: &mut R) -> Result<Vec<Vector3<Float>>, GeometryError> {
    if !(min_depth > 0.0 && max_depth >= min_depth) {
        return Err(GeometryError::Degenerate("depth range must be positive and ordered"));
    }
    let width = camera.width() as Float;
    let height = camera.height() as Float;
    if !(border >= 0.0 && 2.0*border <= width && 2.0*border <= height) {
        return Err(GeometryError::Degenerate("image border leaves no area to sample"));
    }

    let world_T_flippedCamera = invert_rigid(flippedCamera_T_world);
    let x = Uniform::new_inclusive(border, width - border);
    let y = Uniform::new_inclusive(border, height - border);
    let depth = Uniform::new_inclusive(min_depth, max_depth);

    Ok((0..count).map(|_| {
        let pixel = Vector2::<Float>::new(x.sample(rng), y.sample(rng));
        let camera_point = camera.backproject(&pixel, depth.sample(rng));
        (world_T_flippedCamera*camera_point.push(1.0)).fixed_rows::<3>(0).into_owned()
    }).collect())
}

#[allow(non_snake_case)]
pub fn project_points_if<C: Camera>(camera: &C, flippedCamera_T_world: &Matrix4<Float>, points: &[Vector3<Float>]) -> Vec<Option<Vector2<Float>>> {
    points.iter().map(|p| camera.project_to_image_if(flippedCamera_T_world, p)).collect()
}

/**
 * Adds isotropic gaussian noise with the given standard deviation in pixels.
 */
pub fn add_gaussian_noise<R: Rng + ?Sized>(points: &[Vector2<Float>], sigma: Float, rng: &mut R) -> Vec<Vector2<Float>> {
    match Normal::new(0.0, sigma) {
        Ok(normal) if sigma > 0.0 => points.iter().map(|p| p + Vector2::<Float>::new(normal.sample(rng), normal.sample(rng))).collect(),
        _ => points.to_vec()
    }
}

/**
 * Object points observed by several views of one camera, together with their projections.
 */
#[derive(Debug, Clone)]
pub struct SyntheticScene<C: Camera> {
    pub camera: C,
    pub poses_if: Vec<Matrix4<Float>>,
    pub object_points: Vec<Vector3<Float>>,
    pub image_points: Vec<Vec<Vector2<Float>>>
}

impl<C: Camera> SyntheticScene<C> {
    /**
     * Samples points in front of the first view and keeps those visible in every view.
     * At most 100 sampling rounds are run, so fewer than count points may be returned.
     */
    pub fn generate<R: Rng + ?Sized>(camera: C, poses_if: Vec<Matrix4<Float>>, count: usize, min_depth: Float, max_depth: Float, rng: &mut R) -> Result<SyntheticScene<C>, GeometryError> {
        if poses_if.is_empty() {
            return Err(GeometryError::InsufficientViews { required: 1, provided: 0 });
        }
        let width = camera.width() as Float;
        let height = camera.height() as Float;
        let inside = |p: &Vector2<Float>| p[0] >= 0.0 && p[0] < width && p[1] >= 0.0 && p[1] < height;

        let mut object_points = Vec::<Vector3<Float>>::with_capacity(count);
        let mut image_points = vec![Vec::<Vector2<Float>>::with_capacity(count); poses_if.len()];
        for _ in 0..100 {
            if object_points.len() >= count {
                break;
            }

            for point in points_in_front(&camera, &poses_if[0], count - object_points.len(), min_depth, max_depth, 0.0, rng)? {
                let projections = poses_if.iter().map(|pose| {
                    let camera_point = pose*Vector4::<Float>::new(point[0], point[1], point[2], 1.0);
                    match camera_point[2] > 0.0 {
                        true => camera.project(&camera_point.fixed_rows::<3>(0).into_owned()).filter(inside),
                        false => None
                    }
                }).collect::<Option<Vec<Vector2<Float>>>>();

                if let Some(projections) = projections {
                    object_points.push(point);
                    for (view, projection) in image_points.iter_mut().zip(projections) {
                        view.push(projection);
                    }
                }
            }
        }

        debug!("synthetic scene with {} of {} requested points in {} views", object_points.len(), count, poses_if.len());
        Ok(SyntheticScene { camera, poses_if, object_points, image_points })
    }

    pub fn views(&self) -> usize {
        self.poses_if.len()
    }

    pub fn noisy_image_points<R: Rng + ?Sized>(&self, sigma: Float, rng: &mut R) -> Vec<Vec<Vector2<Float>>> {
        self.image_points.iter().map(|points| add_gaussian_noise(points, sigma, rng)).collect()
    }
}
