use serde::{Deserialize, Serialize};

/// Blob detector settings.
///
/// Areas are in square pixels of the image the detector runs on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    /// Side of the adaptive-threshold window (odd, >= 3).
    pub threshold_window: usize,
    /// Subtracted from the local mean before comparison.
    pub threshold_offset: f64,

    pub filter_by_area: bool,
    pub min_area: f64,
    pub max_area: f64,

    /// `4 * pi * area / perimeter^2`; 1.0 for a perfect disc.
    pub filter_by_circularity: bool,
    pub min_circularity: f64,

    /// Ratio of the minor to the major second moment.
    pub filter_by_inertia: bool,
    pub min_inertia_ratio: f64,

    /// Keep only blobs whose centroid lies on a dark thresholded pixel.
    pub filter_by_color: bool,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            threshold_window: 151,
            threshold_offset: 20.0,
            filter_by_area: true,
            min_area: 50.0,
            max_area: 50_000.0,
            filter_by_circularity: true,
            min_circularity: 0.7,
            filter_by_inertia: true,
            min_inertia_ratio: 0.1,
            filter_by_color: true,
        }
    }
}

/// Invalid blob detector settings.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BlobParamsError {
    #[error("threshold_window must be odd and >= 3 (got {0})")]
    InvalidWindow(usize),
    #[error("threshold_offset must be finite")]
    InvalidOffset,
    #[error("area bounds must satisfy 0 <= min_area <= max_area (got {min}..{max})")]
    InvalidAreaRange { min: f64, max: f64 },
    #[error("min_circularity must be in [0, 1] (got {0})")]
    InvalidCircularity(f64),
    #[error("min_inertia_ratio must be in [0, 1] (got {0})")]
    InvalidInertia(f64),
}

impl BlobParams {
    pub fn validate(&self) -> Result<(), BlobParamsError> {
        if self.threshold_window < 3 || self.threshold_window % 2 == 0 {
            return Err(BlobParamsError::InvalidWindow(self.threshold_window));
        }
        if !self.threshold_offset.is_finite() {
            return Err(BlobParamsError::InvalidOffset);
        }
        let (min, max) = (self.min_area, self.max_area);
        if !(min >= 0.0 && min <= max) {
            return Err(BlobParamsError::InvalidAreaRange { min, max });
        }
        if !(0.0..=1.0).contains(&self.min_circularity) {
            return Err(BlobParamsError::InvalidCircularity(self.min_circularity));
        }
        if !(0.0..=1.0).contains(&self.min_inertia_ratio) {
            return Err(BlobParamsError::InvalidInertia(self.min_inertia_ratio));
        }
        Ok(())
    }
}
