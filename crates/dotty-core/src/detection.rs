use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::GrayImageView;

/// Calibration points found in one image.
///
/// `ids`, `object_points` and `image_points` are parallel: entry `k` of each
/// describes the same detected point. An empty detection means "nothing
/// usable in this frame".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPointDetection")]
pub struct PointDetection {
    ids: Vec<u32>,
    object_points: Vec<Point3<f64>>,
    image_points: Vec<Point2<f64>>,
}

impl PointDetection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            ids: Vec::with_capacity(n),
            object_points: Vec::with_capacity(n),
            image_points: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, id: u32, object_point: Point3<f64>, image_point: Point2<f64>) {
        self.ids.push(id);
        self.object_points.push(object_point);
        self.image_points.push(image_point);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Model coordinates (e.g. millimetres on the target plane).
    pub fn object_points(&self) -> &[Point3<f64>] {
        &self.object_points
    }

    /// Pixel coordinates in the input image.
    pub fn image_points(&self) -> &[Point2<f64>] {
        &self.image_points
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Point3<f64>, Point2<f64>)> + '_ {
        self.ids
            .iter()
            .zip(&self.object_points)
            .zip(&self.image_points)
            .map(|((&id, &o), &i)| (id, o, i))
    }

    /// Split into the three parallel arrays.
    pub fn into_parts(self) -> (Vec<u32>, Vec<Point3<f64>>, Vec<Point2<f64>>) {
        (self.ids, self.object_points, self.image_points)
    }
}

#[derive(Deserialize)]
struct RawPointDetection {
    ids: Vec<u32>,
    object_points: Vec<Point3<f64>>,
    image_points: Vec<Point2<f64>>,
}

impl TryFrom<RawPointDetection> for PointDetection {
    type Error = String;

    fn try_from(raw: RawPointDetection) -> Result<Self, Self::Error> {
        let n = raw.ids.len();
        if raw.object_points.len() != n || raw.image_points.len() != n {
            return Err(format!(
                "misaligned detection: {} ids, {} object points, {} image points",
                n,
                raw.object_points.len(),
                raw.image_points.len()
            ));
        }
        Ok(Self {
            ids: raw.ids,
            object_points: raw.object_points,
            image_points: raw.image_points,
        })
    }
}

impl FromIterator<(u32, Point3<f64>, Point2<f64>)> for PointDetection {
    fn from_iter<I: IntoIterator<Item = (u32, Point3<f64>, Point2<f64>)>>(iter: I) -> Self {
        let mut out = PointDetection::empty();
        for (id, o, i) in iter {
            out.push(id, o, i);
        }
        out
    }
}

/// A calibration-target point detector.
///
/// `is_distorted` tells the detector whether `image` still carries lens
/// distortion; returned image points are always in the frame of `image`.
pub trait PointDetector {
    fn get_points(&self, image: &GrayImageView<'_>, is_distorted: bool) -> PointDetection;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_stay_aligned() {
        let det: PointDetection = [
            (3, Point3::new(0.0, 0.0, 0.0), Point2::new(10.0, 20.0)),
            (7, Point3::new(5.0, 0.0, 0.0), Point2::new(30.0, 20.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(det.len(), 2);
        assert_eq!(det.ids(), &[3, 7]);
        assert_eq!(det.object_points().len(), det.image_points().len());
        let (ids, obj, img) = det.into_parts();
        assert_eq!((ids.len(), obj.len(), img.len()), (2, 2, 2));
        assert_eq!(img[1], Point2::new(30.0, 20.0));
    }

    #[test]
    fn empty_detection_has_no_points() {
        let det = PointDetection::empty();
        assert!(det.is_empty());
        assert_eq!(det.iter().count(), 0);
    }

    #[test]
    fn misaligned_json_is_rejected() {
        let ok = r#"{"ids":[1],"object_points":[[0.0,0.0,0.0]],"image_points":[[1.0,2.0]]}"#;
        let det: PointDetection = serde_json::from_str(ok).expect("aligned");
        assert_eq!(det.len(), 1);

        let bad = r#"{"ids":[1,2],"object_points":[[0.0,0.0,0.0]],"image_points":[[1.0,2.0]]}"#;
        assert!(serde_json::from_str::<PointDetection>(bad).is_err());
    }
}
