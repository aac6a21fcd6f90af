//! Pre-processing filters.

use dotty_core::{GrayImage, GrayImageView};
use image::{ImageBuffer, Luma};

/// Gaussian blur with standard deviation `sigma` (pixels).
///
/// Non-positive or non-finite `sigma` returns an unmodified copy.
pub fn gaussian_smooth(view: &GrayImageView<'_>, sigma: f32) -> GrayImage {
    let copy = || GrayImage {
        width: view.width,
        height: view.height,
        data: view.data.to_vec(),
    };
    if !sigma.is_finite() || sigma <= 0.0 || view.width == 0 || view.height == 0 {
        return copy();
    }

    let (w, h) = (view.width as u32, view.height as u32);
    let Some(f) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(
        w,
        h,
        view.data.iter().map(|&v| v as f32).collect(),
    ) else {
        return copy();
    };
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);

    let data = blurred
        .into_raw()
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage {
        width: view.width,
        height: view.height,
        data,
    }
}

/// Local-mean adaptive threshold.
///
/// A pixel becomes 255 when it is brighter than the mean of its
/// `window × window` neighbourhood minus `offset`, and 0 otherwise. The window
/// is clipped at the image border. `window` is expected to be odd.
pub fn adaptive_threshold_mean(view: &GrayImageView<'_>, window: usize, offset: f64) -> GrayImage {
    let (w, h) = (view.width, view.height);
    let mut out = GrayImage {
        width: w,
        height: h,
        data: vec![0; w * h],
    };
    if w == 0 || h == 0 {
        return out;
    }

    // integral[(y+1)*(w+1) + (x+1)] = sum of view[0..=y][0..=x]
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += view.get(x, y) as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let r = window / 2;
    for y in 0..h {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r).min(h - 1) + 1;
        for x in 0..w {
            let x0 = x.saturating_sub(r);
            let x1 = (x + r).min(w - 1) + 1;
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let count = ((y1 - y0) * (x1 - x0)) as f64;
            let mean = sum as f64 / count;
            if view.get(x, y) as f64 > mean - offset {
                out.data[y * w + x] = 255;
            }
        }
    }
    out
}

/// Turn dark pixels (0) into foreground (255) for contour extraction; every
/// other value becomes background.
pub(crate) fn invert_binary(binary: &GrayImage) -> Option<image::GrayImage> {
    let w = u32::try_from(binary.width).ok()?;
    let h = u32::try_from(binary.height).ok()?;
    let data = binary
        .data
        .iter()
        .map(|&v| if v == 0 { 255 } else { 0 })
        .collect();
    image::GrayImage::from_raw(w, h, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(w: usize, h: usize, data: &[u8]) -> GrayImageView<'_> {
        GrayImageView {
            width: w,
            height: h,
            data,
        }
    }

    #[test]
    fn uniform_image_thresholds_to_background() {
        let data = vec![0u8; 25];
        let out = adaptive_threshold_mean(&view(5, 5, &data), 3, 10.0);
        assert!(out.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn dark_spot_on_bright_field_is_foreground() {
        let mut data = vec![200u8; 49];
        data[3 * 7 + 3] = 20;
        let out = adaptive_threshold_mean(&view(7, 7, &data), 5, 5.0);
        assert_eq!(out.get(3, 3), 0);
        assert_eq!(out.get(0, 0), 255);
        assert_eq!(out.get(6, 6), 255);
    }

    #[test]
    fn smoothing_keeps_constant_images() {
        let data = vec![128u8; 100];
        let out = gaussian_smooth(&view(10, 10, &data), 2.0);
        assert!(out.data.iter().all(|&v| v == 128));
    }

    #[test]
    fn smoothing_spreads_an_impulse() {
        let mut data = vec![0u8; 121];
        data[5 * 11 + 5] = 255;
        let out = gaussian_smooth(&view(11, 11, &data), 1.0);
        assert!(out.get(5, 5) < 255);
        assert!(out.get(5, 6) > 0);
        assert!(out.get(5, 5) > out.get(5, 6));
    }

    #[test]
    fn zero_sigma_copies() {
        let data: Vec<u8> = (0..16).collect();
        let out = gaussian_smooth(&view(4, 4, &data), 0.0);
        assert_eq!(out.data, data);
    }
}
