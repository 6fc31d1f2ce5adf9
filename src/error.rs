use thiserror::Error;

use crate::Float;

/// Failure kinds of the geometry estimators.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("need at least {required} correspondences, got {provided}")]
    InsufficientCorrespondences { required: usize, provided: usize },
    #[error("need at least {required} views, got {provided}")]
    InsufficientViews { required: usize, provided: usize },
    #[error("correspondence sets have different lengths")]
    MismatchedCorrespondences,
    #[error("expected {expected} values, got {provided}")]
    InvalidLength { expected: usize, provided: usize },
    #[error("decomposition failed: {0}")]
    DecompositionFailed(&'static str),
    #[error("singular matrix: {0}")]
    SingularMatrix(&'static str),
    #[error("degenerate configuration: {0}")]
    Degenerate(&'static str),
    #[error("unexpected number of real roots: {0}")]
    InvalidRootCount(usize),
    #[error("mean squared reprojection error {squared_error} exceeds {threshold}")]
    ReprojectionErrorTooLarge { squared_error: Float, threshold: Float },
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/**
 * Checks that all correspondence sets have the same length and at least `required` entries.
 */
pub fn check_correspondences(lengths: &[usize], required: usize) -> Result<usize, GeometryError> {
    let provided = lengths.first().copied().unwrap_or(0);
    if lengths.iter().any(|&l| l != provided) {
        return Err(GeometryError::MismatchedCorrespondences);
    }
    match provided {
        n if n < required => Err(GeometryError::InsufficientCorrespondences { required, provided: n }),
        n => Ok(n)
    }
}
