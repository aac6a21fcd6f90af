use dotty_blob::BlobParams;
use dotty_core::ImageSize;
use serde::{Deserialize, Serialize};

/// Configuration for the dotty-grid detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DottyGridParams {
    /// Frames whose matching RMS (reference pixels) exceeds this are discarded.
    pub rms_tolerance: f64,
    /// Standard deviation of the pre-detection Gaussian blur; 0 disables it.
    pub gaussian_sigma: f32,
    /// Blob detector settings, shared by all three detection passes.
    pub blob: BlobParams,
    /// Size of the face-on reference image the model table is expressed in.
    ///
    /// Required; `None` only so that configs can omit it and fail with a
    /// clear error at construction.
    pub reference_image_size: Option<ImageSize>,
}

impl Default for DottyGridParams {
    fn default() -> Self {
        Self {
            rms_tolerance: 30.0,
            gaussian_sigma: 1.0,
            blob: BlobParams::default(),
            reference_image_size: None,
        }
    }
}

impl DottyGridParams {
    /// Defaults with the given reference image size.
    pub fn for_reference(size: ImageSize) -> Self {
        Self {
            reference_image_size: Some(size),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let params: DottyGridParams =
            serde_json::from_str(r#"{"rms_tolerance": 5.0, "blob": {"min_area": 12.0}}"#)
                .expect("json");
        assert_eq!(params.rms_tolerance, 5.0);
        assert_eq!(params.blob.min_area, 12.0);
        assert_eq!(params.blob.threshold_window, BlobParams::default().threshold_window);
        assert_eq!(params.reference_image_size, None);
    }
}
