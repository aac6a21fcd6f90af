//! JSON configuration and report helpers for dotty-grid detection.

use crate::{
    DottyGridDetectionResult, DottyGridDetector, DottyGridError, DottyGridParams, FiducialCorners,
    Homography, ModelError, ModelTable, Rejection,
};
use dotty_core::{CameraModel, PointDetection};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum DottyIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum DottyConfigError {
    #[error("failed to load model table {path}: {source}")]
    Model { path: String, source: ModelError },
    #[error(transparent)]
    Detector(#[from] DottyGridError),
}

fn default_is_distorted() -> bool {
    true
}

/// Configuration for one detection run from the command line.
///
/// Relative paths are used as given (relative to the working directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DottyGridDetectConfig {
    pub image_path: String,
    /// Model table text file (`id ref_x ref_y world_x world_y world_z`).
    pub model_path: String,
    /// Model rows of the TL, TR, BL, BR fiducials.
    pub fiducial_indexes: Vec<usize>,
    pub camera: CameraModel,
    #[serde(default)]
    pub params: DottyGridParams,
    #[serde(default = "default_is_distorted")]
    pub is_distorted: bool,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl DottyGridDetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DottyIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DottyIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dotty_detect_report.json"))
    }

    pub fn load_model(&self) -> Result<ModelTable, DottyConfigError> {
        ModelTable::load_text(&self.model_path).map_err(|source| DottyConfigError::Model {
            path: self.model_path.clone(),
            source,
        })
    }

    /// Load the model table and build a detector from this config.
    pub fn build_detector(&self) -> Result<DottyGridDetector, DottyConfigError> {
        let model = self.load_model()?;
        Ok(DottyGridDetector::new(
            model,
            &self.fiducial_indexes,
            self.camera,
            self.params.clone(),
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DottyGridDetectReport {
    pub image_path: String,
    pub config_path: String,
    pub is_distorted: bool,
    pub detection: PointDetection,
    #[serde(default)]
    pub raw_blobs: usize,
    #[serde(default)]
    pub undistorted_blobs: usize,
    #[serde(default)]
    pub warped_blobs: usize,
    #[serde(default)]
    pub fiducials: Option<FiducialCorners>,
    #[serde(default)]
    pub homography: Option<Homography>,
    #[serde(default)]
    pub rms: Option<f64>,
    #[serde(default)]
    pub rejection: Option<Rejection>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DottyGridDetectReport {
    /// Build an empty report for the given config.
    pub fn new(cfg: &DottyGridDetectConfig, config_path: &Path) -> Self {
        Self {
            image_path: cfg.image_path.clone(),
            config_path: config_path.to_string_lossy().into_owned(),
            is_distorted: cfg.is_distorted,
            detection: PointDetection::empty(),
            raw_blobs: 0,
            undistorted_blobs: 0,
            warped_blobs: 0,
            fiducials: None,
            homography: None,
            rms: None,
            rejection: None,
            error: None,
        }
    }

    /// Populate report fields from a detection run.
    pub fn set_result(&mut self, res: DottyGridDetectionResult) {
        self.detection = res.detection;
        self.raw_blobs = res.raw_blobs;
        self.undistorted_blobs = res.undistorted_blobs;
        self.warped_blobs = res.warped_blobs;
        self.fiducials = res.fiducials;
        self.homography = res.homography;
        self.rms = res.rms;
        self.rejection = res.rejection;
        self.error = None;
    }

    /// Record an error that prevented detection.
    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DottyIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DottyIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
