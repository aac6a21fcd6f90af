use dotty_core::{GrayImage, GrayImageView};
use imageproc::contours::{find_contours, BorderType};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::filter::{adaptive_threshold_mean, invert_binary};
use crate::params::{BlobParams, BlobParamsError};
use crate::shape::ContourShape;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One detected dot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    /// Centroid in pixel coordinates (integer values are pixel centers).
    pub center: Point2<f64>,
    /// Apparent radius in pixels.
    pub radius: f64,
    /// Contour area in square pixels.
    pub area: f64,
}

/// Dark circular blob detector.
#[derive(Clone, Debug)]
pub struct BlobDetector {
    params: BlobParams,
}

impl BlobDetector {
    pub fn new(params: BlobParams) -> Result<Self, BlobParamsError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &BlobParams {
        &self.params
    }

    /// Binary image used for contour extraction: dots are 0, background 255.
    pub fn threshold(&self, image: &GrayImageView<'_>) -> GrayImage {
        adaptive_threshold_mean(
            image,
            self.params.threshold_window,
            self.params.threshold_offset,
        )
    }

    /// Detect dots in `image`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> Vec<KeyPoint> {
        let binary = self.threshold(image);
        self.detect_in_binary(&binary)
    }

    /// Detect dots in an already thresholded image (dots 0, background non-zero).
    pub fn detect_in_binary(&self, binary: &GrayImage) -> Vec<KeyPoint> {
        let Some(foreground) = invert_binary(binary) else {
            return Vec::new();
        };

        let contours = find_contours::<i32>(&foreground);
        let mut out = Vec::new();
        for contour in contours {
            if !matches!(contour.border_type, BorderType::Outer) {
                continue;
            }
            let points: Vec<Point2<f64>> = contour
                .points
                .iter()
                .map(|p| Point2::new(p.x as f64, p.y as f64))
                .collect();
            let Some(shape) = ContourShape::from_polygon(&points) else {
                continue;
            };
            if self.accepts(&shape, binary) {
                out.push(KeyPoint {
                    center: shape.centroid,
                    radius: shape.radius,
                    area: shape.area,
                });
            }
        }

        log::trace!("blob detector kept {} dots", out.len());
        out
    }

    fn accepts(&self, shape: &ContourShape, binary: &GrayImage) -> bool {
        let p = &self.params;
        if p.filter_by_area && (shape.area < p.min_area || shape.area >= p.max_area) {
            return false;
        }
        if p.filter_by_circularity && shape.circularity < p.min_circularity {
            return false;
        }
        if p.filter_by_inertia && shape.inertia_ratio < p.min_inertia_ratio {
            return false;
        }
        if p.filter_by_color {
            let x = shape.centroid.x.round();
            let y = shape.centroid.y.round();
            if x < 0.0 || y < 0.0 || x >= binary.width as f64 || y >= binary.height as f64 {
                return false;
            }
            if binary.get(x as usize, y as usize) != 0 {
                return false;
            }
        }
        true
    }
}
