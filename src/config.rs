use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::{Float, GeometryError};

/**
 * Tolerances and thresholds shared by the estimators.
 * All values can be overridden from a yaml file; missing keys keep their defaults.
 */
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeometryConfig {
    pub eps: Float,
    pub weak_eps: Float,
    pub rank_eps: Float,
    pub collinearity_threshold: Float,
    pub squared_success_threshold: Float,
    /// Number of random triangle draws before the six point selection gives up.
    pub max_sampling_iterations: usize,
    pub min_fundamental_correspondences: usize,
    pub min_trifocal_correspondences: usize,
    pub min_reconstruction_correspondences: usize,
    pub equal_focal_lengths: bool
}

impl Default for GeometryConfig {
    fn default() -> GeometryConfig {
        GeometryConfig {
            eps: 1e-12,
            weak_eps: 1e-6,
            rank_eps: 1e-9,
            collinearity_threshold: 0.05,
            squared_success_threshold: 2.5 * 2.5,
            max_sampling_iterations: 20,
            min_fundamental_correspondences: 8,
            min_trifocal_correspondences: 7,
            min_reconstruction_correspondences: 6,
            equal_focal_lengths: true
        }
    }
}

impl GeometryConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<GeometryConfig, GeometryError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<GeometryConfig, GeometryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String, GeometryError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = GeometryConfig::from_yaml_str("collinearity_threshold: 0.1\nmax_sampling_iterations: 5\n").unwrap();
        assert_eq!(config.collinearity_threshold, 0.1);
        assert_eq!(config.max_sampling_iterations, 5);
        assert_eq!(config.squared_success_threshold, 6.25);
        assert!(config.equal_focal_lengths);
    }

    #[test]
    fn yaml_round_trip() {
        let config = GeometryConfig { weak_eps: 1e-5, ..GeometryConfig::default() };
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(GeometryConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(GeometryConfig::from_yaml_str("eps: [1, 2"), Err(GeometryError::Config(_))));
    }
}
