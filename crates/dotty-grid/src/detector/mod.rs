//! Dotty-grid detection pipeline.
//!
//! This module wires together smoothing, blob detection in the raw and
//! undistorted frames, fiducial ranking, the warp into the reference frame,
//! nearest-model matching with an RMS gate, and re-distortion of the matched
//! points.

mod error;
mod fiducials;
mod matching;
mod params;
mod pipeline;
mod result;

pub use error::DottyGridError;
pub use fiducials::{select_fiducials, FiducialCorners};
pub use matching::{match_to_model, nearest_model_point, retain_unique, rms_error, ModelMatch};
pub use params::DottyGridParams;
pub use pipeline::DottyGridDetector;
pub use result::{DottyGridDetectionResult, Rejection};
