//! Dot (blob) detection for printed dot-grid calibration targets.
//!
//! The detector mirrors the classic "threshold, find contours, filter by
//! shape" approach:
//! - Gaussian smoothing and a local-mean adaptive threshold,
//! - outer contours of dark connected regions,
//! - polygon moments for area, centroid, circularity and inertia ratio.
//!
//! It works on `dotty-core` image views and uses `imageproc` internally.

mod detector;
mod filter;
mod params;
mod shape;

pub use detector::{BlobDetector, KeyPoint};
pub use filter::{adaptive_threshold_mean, gaussian_smooth};
pub use params::{BlobParams, BlobParamsError};
pub use shape::ContourShape;
