//! Regular dot grid layouts and the model tables they produce.

use crate::detector::FiducialCorners;
use crate::model::{ModelError, ModelPoint, ModelTable};
use dotty_core::ImageSize;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error("grid must have at least 2 rows and 2 columns (got {rows}x{cols})")]
    TooSmall { rows: usize, cols: usize },
    #[error("spacing, margin and pitch must be finite and positive")]
    InvalidGeometry,
    #[error("fiducial cell (col={col}, row={row}) is outside the grid")]
    FiducialOutside { col: usize, row: usize },
    #[error("fiducial cells must be listed as top-left, top-right, bottom-left, bottom-right")]
    FiducialOrder,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A `rows x cols` grid of dots with four oversized fiducial dots.
///
/// Dot `(col, row)` gets id `row * cols + col`, reference position
/// `margin + (col, row) * spacing` and world position `(col, row, 0) * pitch`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    /// Dot spacing in reference pixels.
    pub spacing_px: f64,
    /// Distance from the image border to the outer dot centers.
    pub margin_px: f64,
    /// Dot spacing on the physical target (mm).
    pub pitch_mm: f64,
    /// `[col, row]` of the TL, TR, BL, BR fiducials.
    pub fiducial_cells: [[usize; 2]; 4],
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 10,
            spacing_px: 40.0,
            margin_px: 40.0,
            pitch_mm: 5.0,
            fiducial_cells: [[2, 2], [7, 2], [2, 5], [7, 5]],
        }
    }
}

/// Model table, fiducial rows and reference size generated from a layout.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedGrid {
    pub model: ModelTable,
    pub fiducial_indexes: [usize; 4],
    pub reference_size: ImageSize,
}

impl GridLayout {
    /// Size of the reference image: the dot grid plus a margin on each side.
    pub fn reference_size(&self) -> ImageSize {
        let w = 2.0 * self.margin_px + (self.cols.saturating_sub(1)) as f64 * self.spacing_px;
        let h = 2.0 * self.margin_px + (self.rows.saturating_sub(1)) as f64 * self.spacing_px;
        ImageSize::new(w.ceil().max(0.0) as usize, h.ceil().max(0.0) as usize)
    }

    pub fn build(&self) -> Result<GeneratedGrid, LayoutError> {
        if self.rows < 2 || self.cols < 2 {
            return Err(LayoutError::TooSmall {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(self.spacing_px) && positive(self.margin_px) && positive(self.pitch_mm)) {
            return Err(LayoutError::InvalidGeometry);
        }

        let mut points = Vec::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                points.push(ModelPoint::new(
                    (row * self.cols + col) as u32,
                    [
                        self.margin_px + col as f64 * self.spacing_px,
                        self.margin_px + row as f64 * self.spacing_px,
                    ],
                    [col as f64 * self.pitch_mm, row as f64 * self.pitch_mm, 0.0],
                ));
            }
        }
        let model = ModelTable::new(points)?;

        let mut fiducial_indexes = [0usize; 4];
        for (slot, &[col, row]) in fiducial_indexes.iter_mut().zip(&self.fiducial_cells) {
            if col >= self.cols || row >= self.rows {
                return Err(LayoutError::FiducialOutside { col, row });
            }
            *slot = row * self.cols + col;
        }
        let reference = fiducial_indexes.map(|i| model.points()[i].reference);
        if FiducialCorners::rank(reference).map(|c| c.to_array()) != Some(reference) {
            return Err(LayoutError::FiducialOrder);
        }

        Ok(GeneratedGrid {
            model,
            fiducial_indexes,
            reference_size: self.reference_size(),
        })
    }
}
