//! Dotty-grid calibration target detection.
//!
//! A dotty grid is a printed grid of dark circular dots with four oversized
//! fiducial dots. Detection:
//! - finds dots in the raw and undistorted image,
//! - ranks the four largest dots as TL, TR, BL, BR fiducials,
//! - warps the image into the face-on reference frame of a known model table,
//! - matches dots to the model, gates the frame by RMS error, and returns
//!   `(id, object point, image point)` triples in the input frame.
//!
//! Blob detection lives in `dotty-blob`; geometry and the camera model in
//! `dotty-core`.

mod detector;
mod io;
mod layout;
mod model;
mod render;

pub use detector::{
    match_to_model, nearest_model_point, retain_unique, rms_error, select_fiducials,
    DottyGridDetectionResult, DottyGridDetector, DottyGridError, DottyGridParams,
    FiducialCorners, ModelMatch, Rejection,
};
pub use io::{DottyConfigError, DottyGridDetectConfig, DottyGridDetectReport, DottyIoError};
pub use layout::{GeneratedGrid, GridLayout, LayoutError};
pub use model::{ModelError, ModelPoint, ModelTable};
pub use render::{render_distorted, render_reference};

pub use dotty_core::{CameraModel, Homography, PointDetection, PointDetector};
