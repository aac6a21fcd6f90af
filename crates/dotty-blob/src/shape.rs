//! Shape descriptors of a closed contour polygon.

use nalgebra::Point2;

/// Moments-based description of one closed contour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContourShape {
    /// Enclosed polygon area (always >= 0).
    pub area: f64,
    pub perimeter: f64,
    pub centroid: Point2<f64>,
    /// `4 * pi * area / perimeter^2`.
    pub circularity: f64,
    /// Minor over major principal second moment, in `[0, 1]`.
    pub inertia_ratio: f64,
    /// Median distance from the centroid to the contour vertices.
    pub radius: f64,
}

impl ContourShape {
    /// Describe the polygon through `points` (implicitly closed).
    ///
    /// Returns `None` for degenerate polygons with zero area.
    pub fn from_polygon(points: &[Point2<f64>]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }

        // Green's theorem polygon moments up to second order.
        let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
        let (mut m20, mut m11, mut m02) = (0.0, 0.0, 0.0);
        let mut perimeter = 0.0;
        for (k, p) in points.iter().enumerate() {
            let q = points[(k + 1) % points.len()];
            let a = p.x * q.y - q.x * p.y;
            m00 += a;
            m10 += a * (p.x + q.x);
            m01 += a * (p.y + q.y);
            m20 += a * (p.x * p.x + p.x * q.x + q.x * q.x);
            m02 += a * (p.y * p.y + p.y * q.y + q.y * q.y);
            m11 += a * (2.0 * p.x * p.y + p.x * q.y + q.x * p.y + 2.0 * q.x * q.y);
            perimeter += (q - p).norm();
        }
        m00 /= 2.0;
        m10 /= 6.0;
        m01 /= 6.0;
        m20 /= 12.0;
        m02 /= 12.0;
        m11 /= 24.0;

        if m00.abs() < 1e-9 {
            return None;
        }
        // Clockwise traversal yields negative moments.
        if m00 < 0.0 {
            m00 = -m00;
            m10 = -m10;
            m01 = -m01;
            m20 = -m20;
            m02 = -m02;
            m11 = -m11;
        }

        let centroid = Point2::new(m10 / m00, m01 / m00);
        let mu20 = m20 - centroid.x * m10;
        let mu02 = m02 - centroid.y * m01;
        let mu11 = m11 - centroid.x * m01;

        let spread = ((mu20 - mu02).powi(2) + 4.0 * mu11 * mu11).sqrt();
        let i_max = 0.5 * (mu20 + mu02) + 0.5 * spread;
        let i_min = 0.5 * (mu20 + mu02) - 0.5 * spread;
        let inertia_ratio = if i_max > 1e-12 {
            (i_min / i_max).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let circularity = if perimeter > 0.0 {
            4.0 * std::f64::consts::PI * m00 / (perimeter * perimeter)
        } else {
            0.0
        };

        let mut dists: Vec<f64> = points.iter().map(|p| (p - centroid).norm()).collect();
        dists.sort_by(|a, b| a.total_cmp(b));
        let radius = dists[dists.len() / 2];

        Some(Self {
            area: m00,
            perimeter,
            centroid,
            circularity,
            inertia_ratio,
            radius,
        })
    }
}
