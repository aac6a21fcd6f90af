use crate::model::ModelError;
use dotty_blob::BlobParamsError;
use dotty_core::CameraError;

/// Errors returned when building a dotty-grid detector.
///
/// Detection itself never fails; frames that cannot be matched yield an
/// empty [`dotty_core::PointDetection`].
#[derive(thiserror::Error, Debug)]
pub enum DottyGridError {
    #[error("expected exactly 4 fiducial indexes, got {0}")]
    FiducialCount(usize),
    #[error("fiducial index {index} is out of range for a model of {len} points")]
    FiducialOutOfRange { index: usize, len: usize },
    #[error("fiducial index {0} is listed more than once")]
    DuplicateFiducial(usize),
    #[error("model fiducials are degenerate (three of them are collinear)")]
    DegenerateFiducials,
    #[error("reference_image_size is required")]
    MissingReferenceSize,
    #[error("reference_image_size must be non-empty (got {width}x{height})")]
    EmptyReferenceSize { width: usize, height: usize },
    #[error("rms_tolerance must be finite and > 0 (got {0})")]
    InvalidTolerance(f64),
    #[error("gaussian_sigma must be finite and >= 0 (got {0})")]
    InvalidSigma(f32),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Blob(#[from] BlobParamsError),
    #[error(transparent)]
    Model(#[from] ModelError),
}
