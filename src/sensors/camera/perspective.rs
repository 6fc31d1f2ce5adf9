extern crate nalgebra as na;

use na::{Matrix3, Vector2, Vector3};
use crate::{Float, float, GeometryError};
use crate::sensors::camera::Camera;

const DEPTH_EPS: Float = 1e-12;

/**
 * Pinhole camera without distortion.
 */
#[derive(Debug,Copy,Clone)]
pub struct Perspective {
    pub projection: Matrix3<Float>,
    pub inverse_projection: Matrix3<Float>,
    width: usize,
    height: usize
}

impl Perspective {
    pub fn new(fx: Float, fy: Float, cx: Float, cy: Float, s: Float, width: usize, height: usize) -> Perspective {
        let (projection,inverse_projection) = Self::compute_projections(fx,fy,cx,cy,s);
        Perspective{projection,inverse_projection,width,height}
    }

    /**
     * Square pixels and the principal point in the image center.
     */
    pub fn from_fov(width: usize, height: usize, fov_x: Float) -> Result<Perspective, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::Degenerate("zero sized image"));
        }
        if !(fov_x > 0.0 && fov_x < float::consts::PI) {
            return Err(GeometryError::Degenerate("field of view outside (0, pi)"));
        }
        let f = Self::focal_length_from_fov(width, fov_x);
        Ok(Perspective::new(f, f, (width as Float)*0.5, (height as Float)*0.5, 0.0, width, height))
    }

    pub fn from_matrix(mat: &Matrix3<Float>, width: usize, height: usize) -> Perspective {
        Perspective::new(mat[(0,0)],mat[(1,1)],mat[(0,2)],mat[(1,2)],mat[(0,1)],width,height)
    }

    fn compute_projections(fx: Float,fy: Float, cx: Float, cy: Float, s: Float) -> (Matrix3<Float>,Matrix3<Float>) {
        let projection = Matrix3::<Float>::new(fx, s, cx,
            0.0, fy, cy,
            0.0, 0.0, 1.0);

        let k = -cx/fx + s*cy/(fx*fy);
        let inverse_projection = Matrix3::<Float>::new(1.0/fx, -s/(fx*fy), k,
                        0.0, 1.0/fy, -cy/fy,
                        0.0, 0.0, 1.0);

        (projection,inverse_projection)
    }

    pub fn focal_length_from_fov(width: usize, fov_x: Float) -> Float {
        (width as Float)*0.5/(fov_x*0.5).tan()
    }

    pub fn fov_y_to_x(fov_y: Float, aspect_ratio: Float) -> Result<Float, GeometryError> {
        match aspect_ratio {
            a if a > 0.0 => Ok(2.0*((0.5*fov_y).tan()*a).atan()),
            _ => Err(GeometryError::Degenerate("aspect ratio must be positive"))
        }
    }

    pub fn get_fx(&self) -> Float {
        self.projection[(0,0)]
    }

    pub fn get_fy(&self) -> Float {
        self.projection[(1,1)]
    }

    pub fn get_cx(&self) -> Float {
        self.projection[(0,2)]
    }

    pub fn get_cy(&self) -> Float {
        self.projection[(1,2)]
    }

    pub fn get_s(&self) -> Float {
        self.projection[(0,1)]
    }

    pub fn fov_x(&self) -> Float {
        (self.get_cx()/self.get_fx()).atan() + (((self.width as Float) - self.get_cx())/self.get_fx()).atan()
    }

    pub fn fov_y(&self) -> Float {
        (self.get_cy()/self.get_fy()).atan() + (((self.height as Float) - self.get_cy())/self.get_fy()).atan()
    }
}

impl Camera for Perspective {
    fn get_projection(&self) -> Matrix3<Float> {
        self.projection
    }

    fn get_inverse_projection(&self) -> Matrix3<Float> {
        self.inverse_projection
    }

    fn project(&self, position: &Vector3<Float>) -> Option<Vector2<Float>> {
        match position[2] {
            z if z.abs() > DEPTH_EPS => {
                let homogeneous = self.projection*position;
                Some(Vector2::<Float>::new(homogeneous[0]/homogeneous[2], homogeneous[1]/homogeneous[2]))
            },
            _ => None
        }
    }

    fn backproject(&self, point: &Vector2<Float>, depth: Float) -> Vector3<Float> {
        depth*(self.inverse_projection*Vector3::<Float>::new(point[0], point[1], 1.0))
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }
}
