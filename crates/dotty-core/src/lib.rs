//! Core types and utilities for dotty-grid point detection.
//!
//! This crate is small and purely geometric. It does *not* depend on any
//! concrete image decoding library or blob detector; those live in
//! `dotty-blob` and the `dotty` facade.

mod camera;
mod detection;
mod homography;
mod image;
mod logger;

pub use camera::{BrownConrady, CameraError, CameraIntrinsics, CameraModel, UndistortConfig};
pub use detection::{PointDetection, PointDetector};
pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, ImageSize};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, parse_level, LOG_ENV};
