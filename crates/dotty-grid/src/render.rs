//! Synthetic target images, used for tests, benchmarks and the CLI.

use crate::model::ModelTable;
use dotty_core::{sample_bilinear_u8, CameraModel, GrayImage, GrayImageView, ImageSize};
use nalgebra::Point2;

const BACKGROUND: u8 = 255;
const SUPERSAMPLE: usize = 4;

/// Render the face-on reference image of `model`: dark anti-aliased discs on
/// white, fiducial rows drawn with `fiducial_radius`.
///
/// Fiducial indexes outside the model are ignored.
pub fn render_reference(
    model: &ModelTable,
    fiducial_indexes: &[usize],
    size: ImageSize,
    dot_radius: f64,
    fiducial_radius: f64,
) -> GrayImage {
    let mut img = GrayImage::filled(size, BACKGROUND);
    for (index, p) in model.points().iter().enumerate() {
        let r = if fiducial_indexes.contains(&index) {
            fiducial_radius
        } else {
            dot_radius
        };
        draw_disc(&mut img, p.reference, r);
    }
    img
}

/// Simulate lens distortion: the returned image shows `reference` as seen
/// through `camera`, so that `camera.undistort_image` maps it back.
///
/// Pixels whose undistorted location falls outside `reference` are white.
pub fn render_distorted(reference: &GrayImageView<'_>, camera: &CameraModel) -> GrayImage {
    let mut out = GrayImage::filled(reference.size(), BACKGROUND);
    let max_x = reference.width as f64 - 1.0;
    let max_y = reference.height as f64 - 1.0;
    for y in 0..reference.height {
        for x in 0..reference.width {
            let Some(p) = camera.undistort_pixel(Point2::new(x as f64, y as f64)) else {
                continue;
            };
            if p.x >= 0.0 && p.y >= 0.0 && p.x <= max_x && p.y <= max_y {
                out.set(x, y, sample_bilinear_u8(reference, p.x, p.y));
            }
        }
    }
    out
}

fn draw_disc(img: &mut GrayImage, center: Point2<f64>, radius: f64) {
    if !(radius > 0.0) || img.width == 0 || img.height == 0 {
        return;
    }
    let x0 = (center.x - radius - 1.0).floor().max(0.0) as usize;
    let y0 = (center.y - radius - 1.0).floor().max(0.0) as usize;
    let x1 = ((center.x + radius + 1.0).ceil().max(0.0) as usize).min(img.width - 1);
    let y1 = ((center.y + radius + 1.0).ceil().max(0.0) as usize).min(img.height - 1);

    let r2 = radius * radius;
    let step = 1.0 / SUPERSAMPLE as f64;
    let total = (SUPERSAMPLE * SUPERSAMPLE) as f64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let mut inside = 0usize;
            for sy in 0..SUPERSAMPLE {
                for sx in 0..SUPERSAMPLE {
                    // Integer coordinates are pixel centers.
                    let px = x as f64 - 0.5 + (sx as f64 + 0.5) * step;
                    let py = y as f64 - 0.5 + (sy as f64 + 0.5) * step;
                    let dx = px - center.x;
                    let dy = py - center.y;
                    if dx * dx + dy * dy <= r2 {
                        inside += 1;
                    }
                }
            }
            if inside > 0 {
                let value = (BACKGROUND as f64 * (1.0 - inside as f64 / total)).round() as u8;
                let cur = img.get(x, y);
                img.set(x, y, cur.min(value));
            }
        }
    }
}
