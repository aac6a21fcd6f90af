//! Pinhole intrinsics and the five-coefficient Brown-Conrady distortion model.
//!
//! Coefficients follow the OpenCV ordering `[k1, k2, p1, p2, k3]`.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{sample_bilinear_u8, GrayImage, GrayImageView};

/// Camera model validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("focal lengths must be finite and non-zero (fx={fx}, fy={fy})")]
    InvalidFocalLength { fx: f64, fy: f64 },
    #[error("principal point must be finite")]
    InvalidPrincipalPoint,
    #[error("distortion coefficients must be finite")]
    InvalidDistortion,
}

/// Pinhole camera intrinsics in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Build from a row-major 3x3 camera matrix.
    pub fn from_matrix(k: [[f64; 3]; 3]) -> Self {
        Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        }
    }

    pub fn validate(&self) -> Result<(), CameraError> {
        if !self.fx.is_finite() || !self.fy.is_finite() || self.fx.abs() < 1e-12 || self.fy.abs() < 1e-12
        {
            return Err(CameraError::InvalidFocalLength {
                fx: self.fx,
                fy: self.fy,
            });
        }
        if !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(CameraError::InvalidPrincipalPoint);
        }
        Ok(())
    }

    #[inline]
    pub fn pixel_to_normalized(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }

    #[inline]
    pub fn normalized_to_pixel(&self, n: Point2<f64>) -> Point2<f64> {
        Point2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }
}

/// Radial (k1, k2, k3) and tangential (p1, p2) distortion coefficients.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BrownConrady {
    #[serde(default)]
    pub k1: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default)]
    pub p1: f64,
    #[serde(default)]
    pub p2: f64,
    #[serde(default)]
    pub k3: f64,
}

impl BrownConrady {
    pub fn from_opencv(coeffs: [f64; 5]) -> Self {
        let [k1, k2, p1, p2, k3] = coeffs;
        Self { k1, k2, p1, p2, k3 }
    }

    pub fn to_opencv(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.to_opencv().iter().all(|&c| c == 0.0)
    }

    /// Apply the forward model to normalized coordinates.
    pub fn distort_normalized(&self, n: Point2<f64>) -> Point2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        Point2::new(x * radial + x_tan, y * radial + y_tan)
    }
}

/// Settings of the fixed-point iteration used to invert the distortion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UndistortConfig {
    pub max_iters: usize,
    /// Stop when the update norm drops below this (normalized units).
    pub eps: f64,
}

impl Default for UndistortConfig {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-12,
        }
    }
}

/// Intrinsics plus distortion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraModel {
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub distortion: BrownConrady,
}

impl CameraModel {
    pub fn new(intrinsics: CameraIntrinsics, distortion: BrownConrady) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    pub fn validate(&self) -> Result<(), CameraError> {
        self.intrinsics.validate()?;
        if !self.distortion.to_opencv().iter().all(|c| c.is_finite()) {
            return Err(CameraError::InvalidDistortion);
        }
        Ok(())
    }

    /// Map an undistorted pixel into the raw (distorted) image.
    pub fn distort_pixel(&self, undistorted: Point2<f64>) -> Point2<f64> {
        let n = self.intrinsics.pixel_to_normalized(undistorted);
        let d = self.distortion.distort_normalized(n);
        self.intrinsics.normalized_to_pixel(d)
    }

    /// Map a raw pixel into the undistorted frame.
    ///
    /// Returns `None` when the iteration diverges.
    pub fn undistort_pixel(&self, distorted: Point2<f64>) -> Option<Point2<f64>> {
        self.undistort_pixel_with(distorted, UndistortConfig::default())
    }

    pub fn undistort_pixel_with(
        &self,
        distorted: Point2<f64>,
        cfg: UndistortConfig,
    ) -> Option<Point2<f64>> {
        let d = self.intrinsics.pixel_to_normalized(distorted);
        let k = &self.distortion;
        let (mut x, mut y) = (d.x, d.y);

        for _ in 0..cfg.max_iters.max(1) {
            let r2 = x * x + y * y;
            let radial = 1.0 + r2 * (k.k1 + r2 * (k.k2 + r2 * k.k3));
            if !radial.is_finite() || radial.abs() < 1e-12 {
                return None;
            }
            let dx_tan = 2.0 * k.p1 * x * y + k.p2 * (r2 + 2.0 * x * x);
            let dy_tan = k.p1 * (r2 + 2.0 * y * y) + 2.0 * k.p2 * x * y;
            let x_next = (d.x - dx_tan) / radial;
            let y_next = (d.y - dy_tan) / radial;
            if !x_next.is_finite() || !y_next.is_finite() {
                return None;
            }

            let step = (x_next - x).hypot(y_next - y);
            x = x_next;
            y = y_next;
            if step <= cfg.eps.max(0.0) {
                break;
            }
        }

        Some(self.intrinsics.normalized_to_pixel(Point2::new(x, y)))
    }

    /// Remove lens distortion from a whole image, keeping the same camera
    /// matrix for the output.
    ///
    /// Each output pixel samples the source at its distorted location; pixels
    /// that map outside the source are black.
    pub fn undistort_image(&self, src: &GrayImageView<'_>) -> GrayImage {
        let mut out = GrayImage::filled(src.size(), 0);
        if self.distortion.is_zero() {
            out.data.copy_from_slice(src.data);
            return out;
        }
        for y in 0..src.height {
            for x in 0..src.width {
                let p = self.distort_pixel(Point2::new(x as f64, y as f64));
                out.set(x, y, sample_bilinear_u8(src, p.x, p.y));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> CameraModel {
        CameraModel::new(
            CameraIntrinsics {
                fx: 800.0,
                fy: 780.0,
                cx: 320.0,
                cy: 240.0,
            },
            BrownConrady::from_opencv([-0.2, 0.05, 0.001, -0.0005, 0.01]),
        )
    }

    #[test]
    fn undistort_inverts_distort() {
        let cam = camera();
        for p in [
            Point2::new(320.0, 240.0),
            Point2::new(50.0, 30.0),
            Point2::new(600.0, 400.0),
        ] {
            let d = cam.distort_pixel(p);
            let back = cam.undistort_pixel(d).expect("converges");
            assert_relative_eq!(back.x, p.x, epsilon = 1e-6);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn principal_point_is_fixed() {
        let cam = camera();
        let c = cam.distort_pixel(Point2::new(320.0, 240.0));
        assert_relative_eq!(c.x, 320.0);
        assert_relative_eq!(c.y, 240.0);
    }

    #[test]
    fn radial_term_matches_closed_form() {
        let k = BrownConrady {
            k1: 0.1,
            ..BrownConrady::default()
        };
        let d = k.distort_normalized(Point2::new(0.5, 0.0));
        assert_relative_eq!(d.x, 0.5 * (1.0 + 0.1 * 0.25));
        assert_relative_eq!(d.y, 0.0);
    }

    #[test]
    fn zero_focal_length_is_rejected() {
        let mut cam = camera();
        cam.intrinsics.fx = 0.0;
        assert!(matches!(
            cam.validate(),
            Err(CameraError::InvalidFocalLength { .. })
        ));
    }

    #[test]
    fn undistort_image_without_distortion_is_a_copy() {
        let cam = CameraModel::new(camera().intrinsics, BrownConrady::default());
        let data: Vec<u8> = (0..20).collect();
        let view = GrayImageView {
            width: 5,
            height: 4,
            data: &data,
        };
        assert_eq!(cam.undistort_image(&view).data, data);
    }

    #[test]
    fn deserializes_without_distortion() {
        let cam: CameraModel =
            serde_json::from_str(r#"{"intrinsics":{"fx":1.0,"fy":1.0,"cx":0.0,"cy":0.0}}"#)
                .expect("parse");
        assert!(cam.distortion.is_zero());
    }
}
