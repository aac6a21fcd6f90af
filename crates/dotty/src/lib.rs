//! High-level facade crate for the `dotty-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - (feature-gated) helpers that run the dotty-grid detector on an
//!   `image::GrayImage` or a raw grayscale buffer
//! - (feature-gated) the `dotty` command line tool
//!
//! ## Quickstart
//!
//! ```no_run
//! use dotty::detect;
//! use dotty::grid::{DottyGridDetector, DottyGridParams, GridLayout};
//! use dotty::core::{BrownConrady, CameraIntrinsics, CameraModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let grid = GridLayout::default().build()?;
//! let camera = CameraModel::new(
//!     CameraIntrinsics { fx: 900.0, fy: 900.0, cx: 640.0, cy: 360.0 },
//!     BrownConrady::from_opencv([-0.1, 0.02, 0.0, 0.0, 0.0]),
//! );
//! let detector = DottyGridDetector::new(
//!     grid.model,
//!     &grid.fiducial_indexes,
//!     camera,
//!     DottyGridParams::for_reference(grid.reference_size),
//! )?;
//!
//! let img = detect::load_gray("frame.png")?;
//! let points = detect::detect_dotty_grid(&img, &detector, true);
//! println!("detected {} points", points.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `dotty::core`: images, homographies, camera model, `PointDetection`.
//! - `dotty::blob`: smoothing, adaptive threshold, dot detection.
//! - `dotty::grid`: model tables, the dotty-grid detector, rendering, JSON IO.
//! - `dotty::detect` (feature `image`): helpers from `image::GrayImage` and
//!   `image::DynamicImage`.

pub use dotty_blob as blob;
pub use dotty_core as core;
pub use dotty_grid as grid;

pub use dotty_core::{CameraModel, PointDetection, PointDetector};
pub use dotty_grid::{DottyGridDetector, DottyGridParams, ModelTable};

#[cfg(feature = "image")]
pub mod detect;

/// Install a `tracing` subscriber and forward `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    // Fails only when a `log` logger is already installed.
    let _ = tracing_log::LogTracer::init();
    dotty_core::init_tracing(json);
}
