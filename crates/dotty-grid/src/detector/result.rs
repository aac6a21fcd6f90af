use super::FiducialCorners;
use dotty_core::{Homography, PointDetection};
use serde::{Deserialize, Serialize};

/// Why a frame produced no points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// One of the first two blob passes found four dots or fewer.
    TooFewBlobs { raw: usize, undistorted: usize },
    /// The four largest dots do not occupy four distinct quadrants.
    DegenerateFiducials,
    /// No finite homography from the detected fiducials to the model.
    HomographyFailed,
    /// Matching error above `rms_tolerance`.
    RmsTooLarge { rms: f64, tolerance: f64 },
    /// Every matched model id was hit more than once.
    NoUniqueMatches,
}

/// Output of a dotty-grid detection run with intermediate diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DottyGridDetectionResult {
    pub detection: PointDetection,
    /// Dots found in the smoothed input image.
    pub raw_blobs: usize,
    /// Dots found in the undistorted image.
    pub undistorted_blobs: usize,
    /// Dots found in the image warped into the reference frame.
    pub warped_blobs: usize,
    /// Detected fiducials in the undistorted frame.
    pub fiducials: Option<FiducialCorners>,
    /// Mapping from the undistorted frame into the reference frame.
    pub homography: Option<Homography>,
    pub rms: Option<f64>,
    /// Keypoints dropped because their model id was matched more than once.
    pub duplicates_dropped: usize,
    pub rejection: Option<Rejection>,
}

impl DottyGridDetectionResult {
    pub(crate) fn new(raw_blobs: usize, undistorted_blobs: usize) -> Self {
        Self {
            detection: PointDetection::empty(),
            raw_blobs,
            undistorted_blobs,
            warped_blobs: 0,
            fiducials: None,
            homography: None,
            rms: None,
            duplicates_dropped: 0,
            rejection: None,
        }
    }

    pub(crate) fn rejected(mut self, reason: Rejection) -> Self {
        self.detection = PointDetection::empty();
        self.rejection = Some(reason);
        self
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }
}
