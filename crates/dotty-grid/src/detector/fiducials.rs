//! Fiducial selection: the four largest dots, ordered TL, TR, BL, BR.

use dotty_blob::KeyPoint;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// The four fiducial dots in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiducialCorners {
    pub top_left: Point2<f64>,
    pub top_right: Point2<f64>,
    pub bottom_left: Point2<f64>,
    pub bottom_right: Point2<f64>,
}

impl FiducialCorners {
    /// Build from points already in TL, TR, BL, BR order.
    pub fn from_array(pts: [Point2<f64>; 4]) -> Self {
        Self {
            top_left: pts[0],
            top_right: pts[1],
            bottom_left: pts[2],
            bottom_right: pts[3],
        }
    }

    pub fn to_array(&self) -> [Point2<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Order four points by their position relative to their centroid.
    ///
    /// Each point gets rank `right + 2 * below`, where `right` and `below`
    /// compare against the centroid. Returns `None` unless the ranks are a
    /// permutation of `0..4` (e.g. for strongly rotated or collinear sets).
    pub fn rank(pts: [Point2<f64>; 4]) -> Option<Self> {
        let cx = pts.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;

        let mut slots: [Option<Point2<f64>>; 4] = [None; 4];
        for p in pts {
            let rank = usize::from(p.x > cx) + 2 * usize::from(p.y > cy);
            if slots[rank].replace(p).is_some() {
                return None;
            }
        }
        let [Some(tl), Some(tr), Some(bl), Some(br)] = slots else {
            return None;
        };
        Some(Self::from_array([tl, tr, bl, br]))
    }
}

/// Pick the four largest keypoints (by radius) and rank them.
///
/// Ties keep the detection order.
pub fn select_fiducials(keypoints: &[KeyPoint]) -> Option<FiducialCorners> {
    if keypoints.len() < 4 {
        return None;
    }
    let mut order: Vec<usize> = (0..keypoints.len()).collect();
    order.sort_by(|&a, &b| keypoints[b].radius.total_cmp(&keypoints[a].radius));

    let pts = [
        keypoints[order[0]].center,
        keypoints[order[1]].center,
        keypoints[order[2]].center,
        keypoints[order[3]].center,
    ];
    FiducialCorners::rank(pts)
}
