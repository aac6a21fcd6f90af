//! Model table: expected dot positions in the reference image and on the target.

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// One expected dot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelPoint {
    pub id: u32,
    /// Position in the face-on reference image (pixels).
    pub reference: Point2<f64>,
    /// Position on the physical target (e.g. millimetres).
    pub world: Point3<f64>,
}

impl ModelPoint {
    pub fn new(id: u32, reference: [f64; 2], world: [f64; 3]) -> Self {
        Self {
            id,
            reference: Point2::new(reference[0], reference[1]),
            world: Point3::new(world[0], world[1], world[2]),
        }
    }
}

/// Model table validation and parsing errors.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("model table is empty")]
    Empty,
    #[error("model id {0} appears more than once")]
    DuplicateId(u32),
    #[error("model row {row} has non-finite coordinates")]
    NonFinite { row: usize },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Ordered, validated list of model points.
///
/// Ids are unique and all coordinates finite. Row order is preserved; fiducial
/// indexes refer to rows, not ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ModelPoint>", into = "Vec<ModelPoint>")]
pub struct ModelTable {
    points: Vec<ModelPoint>,
}

impl TryFrom<Vec<ModelPoint>> for ModelTable {
    type Error = ModelError;

    fn try_from(points: Vec<ModelPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<ModelTable> for Vec<ModelPoint> {
    fn from(table: ModelTable) -> Self {
        table.points
    }
}

impl ModelTable {
    pub fn new(points: Vec<ModelPoint>) -> Result<Self, ModelError> {
        if points.is_empty() {
            return Err(ModelError::Empty);
        }
        let mut seen = HashSet::with_capacity(points.len());
        for (row, p) in points.iter().enumerate() {
            let finite = p.reference.iter().chain(p.world.iter()).all(|v| v.is_finite());
            if !finite {
                return Err(ModelError::NonFinite { row });
            }
            if !seen.insert(p.id) {
                return Err(ModelError::DuplicateId(p.id));
            }
        }
        Ok(Self { points })
    }

    /// Parse six-column rows `id ref_x ref_y world_x world_y world_z`.
    ///
    /// Columns may be separated by whitespace or commas. Blank lines and
    /// lines starting with `#` are skipped. Ids may be written as integral
    /// floats (`12.0`).
    pub fn parse_text(text: &str) -> Result<Self, ModelError> {
        let mut points = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let values = trimmed
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| {
                    t.parse::<f64>().map_err(|_| ModelError::Parse {
                        line,
                        message: format!("invalid number {t:?}"),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            let [id, rx, ry, wx, wy, wz] = values[..] else {
                return Err(ModelError::Parse {
                    line,
                    message: format!("expected 6 columns, found {}", values.len()),
                });
            };
            if id < 0.0 || id.fract() != 0.0 || id > u32::MAX as f64 {
                return Err(ModelError::Parse {
                    line,
                    message: format!("id {id} is not a non-negative integer"),
                });
            }
            points.push(ModelPoint::new(id as u32, [rx, ry], [wx, wy, wz]));
        }
        Self::new(points)
    }

    pub fn load_text(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)?;
        Self::parse_text(&raw)
    }

    /// Render in the format accepted by [`ModelTable::parse_text`].
    pub fn to_text(&self) -> String {
        let mut out = String::from("# id ref_x ref_y world_x world_y world_z\n");
        for p in &self.points {
            let _ = writeln!(
                out,
                "{} {} {} {} {} {}",
                p.id, p.reference.x, p.reference.y, p.world.x, p.world.y, p.world.z
            );
        }
        out
    }

    pub fn write_text(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`: construction rejects empty tables.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[ModelPoint] {
        &self.points
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&ModelPoint> {
        self.points.get(index)
    }

    #[inline]
    pub fn reference_point(&self, index: usize) -> Option<Point2<f64>> {
        self.points.get(index).map(|p| p.reference)
    }

    #[inline]
    pub fn world_point(&self, index: usize) -> Option<Point3<f64>> {
        self.points.get(index).map(|p| p.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whitespace_and_comma_rows() {
        let text = "# header\n0 10 20 0 0 0\n\n1.0, 30, 20, 5.0, 0, 0\n";
        let model = ModelTable::parse_text(text).expect("parse");
        assert_eq!(model.len(), 2);
        assert_eq!(model.points()[1].id, 1);
        assert_eq!(model.points()[1].reference, Point2::new(30.0, 20.0));
        assert_eq!(model.points()[1].world, Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn text_round_trips() {
        let model = ModelTable::new(vec![
            ModelPoint::new(4, [1.5, 2.25], [0.0, 3.0, 0.0]),
            ModelPoint::new(9, [10.0, 2.25], [3.0, 3.0, 0.0]),
        ])
        .expect("model");
        let back = ModelTable::parse_text(&model.to_text()).expect("parse");
        assert_eq!(back, model);
    }

    #[test]
    fn rejects_wrong_column_count() {
        let err = ModelTable::parse_text("0 1 2 3 4\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 1, .. }));
    }

    #[test]
    fn rejects_fractional_ids() {
        let err = ModelTable::parse_text("0.5 1 2 3 4 5\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_ids_and_empty_tables() {
        let err = ModelTable::parse_text("3 1 2 0 0 0\n3 5 2 0 0 0\n").unwrap_err();
        assert!(matches!(err, ModelError::DuplicateId(3)));
        assert!(matches!(
            ModelTable::parse_text("# nothing\n"),
            Err(ModelError::Empty)
        ));
    }

    #[test]
    fn json_deserialization_validates() {
        let bad = r#"[
            {"id": 1, "reference": [0.0, 0.0], "world": [0.0, 0.0, 0.0]},
            {"id": 1, "reference": [5.0, 0.0], "world": [1.0, 0.0, 0.0]}
        ]"#;
        assert!(serde_json::from_str::<ModelTable>(bad).is_err());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.txt");
        let model = ModelTable::new(vec![ModelPoint::new(0, [1.0, 1.0], [0.0, 0.0, 0.0])])
            .expect("model");
        model.write_text(&path).expect("write");
        assert_eq!(ModelTable::load_text(&path).expect("load"), model);
    }
}
