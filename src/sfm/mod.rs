pub mod normalization;
pub mod epipolar;
pub mod triangulation;
pub mod trifocal;
pub mod projective;
pub mod autocalibration;
pub mod synthetic;
