use crate::{core, grid};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

/// Convert an `image::GrayImage` into the lightweight `dotty-core` view type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Copy a `dotty-core` image into an `image::GrayImage`.
pub fn to_image(img: &core::GrayImage) -> Result<::image::GrayImage, DetectError> {
    let width = u32::try_from(img.width).ok();
    let height = u32::try_from(img.height).ok();
    let Some((width, height)) = width.zip(height) else {
        return Err(DetectError::InvalidGrayDimensions {
            width: u32::MAX,
            height: u32::MAX,
        });
    };
    gray_image_from_slice(width, height, &img.data)
}

/// Open an image file of any supported format and convert it to 8-bit gray.
pub fn load_gray(path: impl AsRef<Path>) -> Result<::image::GrayImage, DetectError> {
    Ok(::image::open(path)?.to_luma8())
}

/// Run the dotty-grid detector on an image.
///
/// `is_distorted = false` means the image is already undistorted; image
/// points are always returned in the frame of `img`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, detector),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn detect_dotty_grid(
    img: &::image::GrayImage,
    detector: &grid::DottyGridDetector,
    is_distorted: bool,
) -> core::PointDetection {
    detector.detect(&gray_view(img), is_distorted)
}

/// Run the dotty-grid detector on a decoded image of any pixel format.
///
/// Colour images are converted to 8-bit luma first.
pub fn detect_dotty_grid_dynamic(
    img: &::image::DynamicImage,
    detector: &grid::DottyGridDetector,
    is_distorted: bool,
) -> core::PointDetection {
    match img {
        ::image::DynamicImage::ImageLuma8(gray) => detect_dotty_grid(gray, detector, is_distorted),
        other => detect_dotty_grid(&other.to_luma8(), detector, is_distorted),
    }
}

/// Same as [`detect_dotty_grid`], keeping the intermediate diagnostics.
pub fn detect_dotty_grid_with_diagnostics(
    img: &::image::GrayImage,
    detector: &grid::DottyGridDetector,
    is_distorted: bool,
) -> grid::DottyGridDetectionResult {
    detector.detect_with_diagnostics(&gray_view(img), is_distorted)
}

/// Build an `image::GrayImage` from a raw grayscale buffer.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DetectError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidGrayDimensions { width, height })
}

pub fn detect_dotty_grid_from_gray_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    detector: &grid::DottyGridDetector,
    is_distorted: bool,
) -> Result<core::PointDetection, DetectError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    Ok(detect_dotty_grid(&img, detector, is_distorted))
}
