pub mod config;
pub mod error;
pub mod numerics;
pub mod sensors;
pub mod sfm;

pub use config::GeometryConfig;
pub use error::GeometryError;

macro_rules! define_float {
    ($f:tt) => {
        pub use std::$f as float;
        pub type Float = $f;
    }
}

define_float!(f64);

pub type Result<T> = std::result::Result<T, GeometryError>;
