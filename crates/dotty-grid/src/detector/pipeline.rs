use super::fiducials::select_fiducials;
use super::matching::{match_to_model, rms_error, retain_unique};
use super::{DottyGridDetectionResult, DottyGridError, DottyGridParams, Rejection};
use crate::model::ModelTable;
use dotty_blob::{gaussian_smooth, BlobDetector};
use dotty_core::{
    homography_from_4pt, warp_perspective_gray, CameraModel, GrayImage, GrayImageView, ImageSize,
    PointDetection, PointDetector,
};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Fiducial-anchored dot grid detector.
///
/// Immutable after construction; one detector can serve many frames and
/// threads.
#[derive(Clone, Debug)]
pub struct DottyGridDetector {
    model: ModelTable,
    fiducial_indexes: [usize; 4],
    fiducial_reference: [Point2<f64>; 4],
    camera: CameraModel,
    params: DottyGridParams,
    reference_size: ImageSize,
    blobs: BlobDetector,
}

impl DottyGridDetector {
    /// Create a detector for a model table.
    ///
    /// `fiducial_indexes` are rows of `model` in TL, TR, BL, BR order.
    pub fn new(
        model: ModelTable,
        fiducial_indexes: &[usize],
        camera: CameraModel,
        params: DottyGridParams,
    ) -> Result<Self, DottyGridError> {
        let fiducial_indexes: [usize; 4] = fiducial_indexes
            .try_into()
            .map_err(|_| DottyGridError::FiducialCount(fiducial_indexes.len()))?;
        for (k, &index) in fiducial_indexes.iter().enumerate() {
            if index >= model.len() {
                return Err(DottyGridError::FiducialOutOfRange {
                    index,
                    len: model.len(),
                });
            }
            if fiducial_indexes[..k].contains(&index) {
                return Err(DottyGridError::DuplicateFiducial(index));
            }
        }
        let fiducial_reference = fiducial_indexes.map(|i| model.points()[i].reference);
        if homography_from_4pt(&fiducial_reference, &fiducial_reference).is_none() {
            return Err(DottyGridError::DegenerateFiducials);
        }

        let reference_size = params
            .reference_image_size
            .ok_or(DottyGridError::MissingReferenceSize)?;
        if reference_size.is_empty() {
            return Err(DottyGridError::EmptyReferenceSize {
                width: reference_size.width,
                height: reference_size.height,
            });
        }
        if !(params.rms_tolerance.is_finite() && params.rms_tolerance > 0.0) {
            return Err(DottyGridError::InvalidTolerance(params.rms_tolerance));
        }
        if !(params.gaussian_sigma.is_finite() && params.gaussian_sigma >= 0.0) {
            return Err(DottyGridError::InvalidSigma(params.gaussian_sigma));
        }
        camera.validate()?;
        let blobs = BlobDetector::new(params.blob.clone())?;

        Ok(Self {
            model,
            fiducial_indexes,
            fiducial_reference,
            camera,
            params,
            reference_size,
            blobs,
        })
    }

    #[inline]
    pub fn model(&self) -> &ModelTable {
        &self.model
    }

    #[inline]
    pub fn fiducial_indexes(&self) -> [usize; 4] {
        self.fiducial_indexes
    }

    #[inline]
    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    #[inline]
    pub fn params(&self) -> &DottyGridParams {
        &self.params
    }

    #[inline]
    pub fn reference_size(&self) -> ImageSize {
        self.reference_size
    }

    /// Detect grid points in `image`.
    ///
    /// Image points are returned in the frame of `image`. With
    /// `is_distorted = false` the image is taken as already undistorted and
    /// no lens model is applied. An empty result means the frame is unusable.
    pub fn detect(&self, image: &GrayImageView<'_>, is_distorted: bool) -> PointDetection {
        self.detect_with_diagnostics(image, is_distorted).detection
    }

    /// Same as [`DottyGridDetector::detect`], also reporting intermediate
    /// counts and the reason a frame was rejected.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image),
            fields(width = image.width, height = image.height)
        )
    )]
    pub fn detect_with_diagnostics(
        &self,
        image: &GrayImageView<'_>,
        is_distorted: bool,
    ) -> DottyGridDetectionResult {
        let smoothed = gaussian_smooth(image, self.params.gaussian_sigma);
        let raw = self.blobs.detect(&smoothed.view());

        let undistorted_owned: GrayImage;
        let (undistorted, undistorted_kps) = if is_distorted {
            undistorted_owned = self.camera.undistort_image(&smoothed.view());
            let kps = self.blobs.detect(&undistorted_owned.view());
            (&undistorted_owned, kps)
        } else {
            (&smoothed, raw.clone())
        };

        let result = DottyGridDetectionResult::new(raw.len(), undistorted_kps.len());
        if raw.len() <= 4 || undistorted_kps.len() <= 4 {
            log::debug!(
                "too few dots (raw={}, undistorted={})",
                raw.len(),
                undistorted_kps.len()
            );
            return result.rejected(Rejection::TooFewBlobs {
                raw: raw.len(),
                undistorted: undistorted_kps.len(),
            });
        }

        self.match_undistorted(undistorted, &undistorted_kps, is_distorted, result)
    }

    fn match_undistorted(
        &self,
        undistorted: &GrayImage,
        undistorted_kps: &[dotty_blob::KeyPoint],
        is_distorted: bool,
        mut result: DottyGridDetectionResult,
    ) -> DottyGridDetectionResult {
        let Some(fiducials) = select_fiducials(undistorted_kps) else {
            log::debug!("largest dots do not form a TL/TR/BL/BR quadrilateral");
            return result.rejected(Rejection::DegenerateFiducials);
        };
        result.fiducials = Some(fiducials);

        let Some((h, h_inv)) = homography_from_4pt(&fiducials.to_array(), &self.fiducial_reference)
            .and_then(|h| h.inverse().map(|inv| (h, inv)))
        else {
            log::debug!("no homography from detected fiducials {fiducials:?}");
            return result.rejected(Rejection::HomographyFailed);
        };
        result.homography = Some(h);

        let warped = warp_perspective_gray(&undistorted.view(), &h_inv, self.reference_size);
        let warped_pts: Vec<Point2<f64>> = self
            .blobs
            .detect(&warped.view())
            .into_iter()
            .map(|kp| kp.center)
            .collect();
        result.warped_blobs = warped_pts.len();

        let matches = match_to_model(&self.model, &warped_pts);
        let rms = rms_error(&matches, undistorted_kps.len());
        result.rms = Some(rms);
        if !(rms <= self.params.rms_tolerance) {
            log::debug!(
                "matching rms {rms:.3} exceeds tolerance {:.3}",
                self.params.rms_tolerance
            );
            return result.rejected(Rejection::RmsTooLarge {
                rms,
                tolerance: self.params.rms_tolerance,
            });
        }

        let candidates: Vec<(usize, Point2<f64>)> = matches
            .iter()
            .zip(&warped_pts)
            .map(|(m, &p)| {
                let undistorted_pt = h_inv.apply(p);
                let image_pt = if is_distorted {
                    self.camera.distort_pixel(undistorted_pt)
                } else {
                    undistorted_pt
                };
                (m.model_index, image_pt)
            })
            .collect();
        let total = candidates.len();
        let mut kept = retain_unique(candidates);
        result.duplicates_dropped = total - kept.len();
        if kept.is_empty() {
            log::debug!("no model point matched exactly once");
            return result.rejected(Rejection::NoUniqueMatches);
        }
        kept.sort_unstable_by_key(|(index, _)| *index);

        result.detection = kept
            .into_iter()
            .map(|(index, image_pt)| {
                let mp = &self.model.points()[index];
                (mp.id, mp.world, image_pt)
            })
            .collect();
        log::debug!(
            "matched {} of {} model points (rms {rms:.3}, {} duplicates dropped)",
            result.detection.len(),
            self.model.len(),
            result.duplicates_dropped
        );
        result
    }
}

impl PointDetector for DottyGridDetector {
    fn get_points(&self, image: &GrayImageView<'_>, is_distorted: bool) -> PointDetection {
        self.detect(image, is_distorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelPoint;
    use dotty_core::{BrownConrady, CameraIntrinsics};

    fn model() -> ModelTable {
        let mut points = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                let id = (r * 3 + c) as u32;
                points.push(ModelPoint::new(
                    id,
                    [20.0 + 30.0 * c as f64, 20.0 + 30.0 * r as f64],
                    [5.0 * c as f64, 5.0 * r as f64, 0.0],
                ));
            }
        }
        ModelTable::new(points).expect("model")
    }

    fn camera() -> CameraModel {
        CameraModel::new(
            CameraIntrinsics {
                fx: 100.0,
                fy: 100.0,
                cx: 50.0,
                cy: 50.0,
            },
            BrownConrady::default(),
        )
    }

    fn params() -> DottyGridParams {
        DottyGridParams::for_reference(ImageSize::new(100, 100))
    }

    #[test]
    fn builds_with_valid_arguments() {
        let det = DottyGridDetector::new(model(), &[0, 2, 6, 8], camera(), params())
            .expect("detector");
        assert_eq!(det.fiducial_indexes(), [0, 2, 6, 8]);
        assert_eq!(det.reference_size(), ImageSize::new(100, 100));
    }

    #[test]
    fn rejects_wrong_fiducial_count() {
        let err = DottyGridDetector::new(model(), &[0, 2, 6], camera(), params()).unwrap_err();
        assert!(matches!(err, DottyGridError::FiducialCount(3)));
    }

    #[test]
    fn rejects_out_of_range_and_duplicate_fiducials() {
        let err = DottyGridDetector::new(model(), &[0, 2, 6, 9], camera(), params()).unwrap_err();
        assert!(matches!(
            err,
            DottyGridError::FiducialOutOfRange { index: 9, len: 9 }
        ));
        let err = DottyGridDetector::new(model(), &[0, 2, 2, 8], camera(), params()).unwrap_err();
        assert!(matches!(err, DottyGridError::DuplicateFiducial(2)));
    }

    #[test]
    fn rejects_collinear_fiducials() {
        let err = DottyGridDetector::new(model(), &[0, 1, 2, 8], camera(), params()).unwrap_err();
        assert!(matches!(err, DottyGridError::DegenerateFiducials));
    }

    #[test]
    fn requires_a_reference_size() {
        let err = DottyGridDetector::new(
            model(),
            &[0, 2, 6, 8],
            camera(),
            DottyGridParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DottyGridError::MissingReferenceSize));

        let empty = DottyGridParams::for_reference(ImageSize::new(0, 10));
        let err = DottyGridDetector::new(model(), &[0, 2, 6, 8], camera(), empty).unwrap_err();
        assert!(matches!(err, DottyGridError::EmptyReferenceSize { .. }));
    }

    #[test]
    fn rejects_bad_tolerance_sigma_and_camera() {
        let mut p = params();
        p.rms_tolerance = 0.0;
        let err = DottyGridDetector::new(model(), &[0, 2, 6, 8], camera(), p).unwrap_err();
        assert!(matches!(err, DottyGridError::InvalidTolerance(_)));

        let mut p = params();
        p.gaussian_sigma = f32::NAN;
        let err = DottyGridDetector::new(model(), &[0, 2, 6, 8], camera(), p).unwrap_err();
        assert!(matches!(err, DottyGridError::InvalidSigma(_)));

        let mut cam = camera();
        cam.intrinsics.fx = 0.0;
        let err = DottyGridDetector::new(model(), &[0, 2, 6, 8], cam, params()).unwrap_err();
        assert!(matches!(err, DottyGridError::Camera(_)));
    }

    #[test]
    fn rejects_invalid_blob_params() {
        let mut p = params();
        p.blob.threshold_window = 2;
        let err = DottyGridDetector::new(model(), &[0, 2, 6, 8], camera(), p).unwrap_err();
        assert!(matches!(err, DottyGridError::Blob(_)));
    }

    #[test]
    fn blank_frame_is_rejected_with_reason() {
        let det = DottyGridDetector::new(model(), &[0, 2, 6, 8], camera(), params())
            .expect("detector");
        let img = GrayImage::filled(ImageSize::new(100, 100), 200);
        let res = det.detect_with_diagnostics(&img.view(), true);
        assert!(res.detection.is_empty());
        assert_eq!(
            res.rejection,
            Some(Rejection::TooFewBlobs {
                raw: 0,
                undistorted: 0
            })
        );
    }

    #[test]
    fn detector_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DottyGridDetector>();
    }
}
