//! Nearest-model-point matching, RMS gate and uniqueness filter.

use crate::model::ModelTable;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Assignment of one warped keypoint to a model row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelMatch {
    /// Row in the model table.
    pub model_index: usize,
    /// Squared distance in reference pixels.
    pub distance_sq: f64,
}

/// Model row whose reference position is closest to `p`.
///
/// Ties resolve to the earlier row.
pub fn nearest_model_point(model: &ModelTable, p: Point2<f64>) -> Option<ModelMatch> {
    let mut best: Option<ModelMatch> = None;
    for (model_index, mp) in model.points().iter().enumerate() {
        let distance_sq = (mp.reference - p).norm_squared();
        if best.is_none_or(|b| distance_sq < b.distance_sq) {
            best = Some(ModelMatch {
                model_index,
                distance_sq,
            });
        }
    }
    best
}

/// Match every warped point to its nearest model point, in input order.
pub fn match_to_model(model: &ModelTable, warped: &[Point2<f64>]) -> Vec<ModelMatch> {
    warped
        .iter()
        .filter_map(|&p| nearest_model_point(model, p))
        .collect()
}

/// `sqrt(sum(distance_sq) / normalizer)`.
///
/// The normalizer is passed explicitly because the detector divides by the
/// number of undistorted keypoints rather than the number of matches.
/// Returns infinity for a zero normalizer.
pub fn rms_error(matches: &[ModelMatch], normalizer: usize) -> f64 {
    if normalizer == 0 {
        return f64::INFINITY;
    }
    let sum_sq: f64 = matches.iter().map(|m| m.distance_sq).sum();
    (sum_sq / normalizer as f64).sqrt()
}

/// Keep entries whose model row occurs exactly once; order is preserved.
pub fn retain_unique<T>(matched: Vec<(usize, T)>) -> Vec<(usize, T)> {
    let mut counts: HashMap<usize, usize> = HashMap::with_capacity(matched.len());
    for (idx, _) in &matched {
        *counts.entry(*idx).or_default() += 1;
    }
    matched
        .into_iter()
        .filter(|(idx, _)| counts.get(idx) == Some(&1))
        .collect()
}
