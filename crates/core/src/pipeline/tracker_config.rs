use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detection::domain::object_detector::DetectParams;
use crate::eye_center::estimator::EyeCenterConfig;
use crate::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_DETECTION_SCALE, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_RATE,
    DEFAULT_FRAME_WIDTH, DEFAULT_PIPELINE_WIDTH, EYE_HISTORY_DEPTH, FACE_HISTORY_DEPTH,
    HANDOFF_CAPACITY,
};
use crate::shared::error::TrackingError;
use crate::shared::geometry::DEFAULT_IOU_THRESHOLD;
use crate::tracking::eye_regions::EyeRegionLayout;
use crate::tracking::temporal_smoother::AveragingMode;

/// How eye-center samples are assigned to smoothing histories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeSmoothing {
    /// One history per eye side.
    #[default]
    PerEye,
    /// A single history fed by both eyes in turn.
    Shared,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub face_depth: usize,
    pub eye_depth: usize,
    pub eye_mode: EyeSmoothing,
    pub averaging: AveragingMode,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            face_depth: FACE_HISTORY_DEPTH,
            eye_depth: EYE_HISTORY_DEPTH,
            eye_mode: EyeSmoothing::default(),
            averaging: AveragingMode::default(),
        }
    }
}

/// Every tunable of a tracking run.
///
/// Serialized as JSON for config files; fields missing from a file keep
/// their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub frame_rate: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub camera_index: u32,
    /// Camera device name or path; overrides `camera_index`.
    pub camera_device: Option<String>,
    pub face_model: Option<PathBuf>,
    pub eye_model: Option<PathBuf>,
    /// Factor the grayscale frame is divided by before detection.
    pub detection_scale: f64,
    /// Maximum frames in flight.
    pub pipeline_width: usize,
    pub handoff_capacity: usize,
    pub face_params: DetectParams,
    pub eye_params: DetectParams,
    /// Candidates overlapping an earlier one by more than this are dropped.
    pub iou_threshold: f64,
    pub eye_layout: EyeRegionLayout,
    pub eye_center: EyeCenterConfig,
    pub smoothing: SmoothingConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            camera_index: DEFAULT_CAMERA_INDEX,
            camera_device: None,
            face_model: None,
            eye_model: None,
            detection_scale: DEFAULT_DETECTION_SCALE,
            pipeline_width: DEFAULT_PIPELINE_WIDTH,
            handoff_capacity: HANDOFF_CAPACITY,
            face_params: DetectParams::FACE,
            eye_params: DetectParams::EYE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            eye_layout: EyeRegionLayout::default(),
            eye_center: EyeCenterConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self, TrackingError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TrackingError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            TrackingError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), TrackingError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackingError::InvalidConfig(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TrackingError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            TrackingError::InvalidConfig(format!("cannot write {}: {e}", path.display()))
        })
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), TrackingError> {
        fn check(ok: bool, message: &str) -> Result<(), TrackingError> {
            if ok {
                Ok(())
            } else {
                Err(TrackingError::InvalidConfig(message.to_string()))
            }
        }

        check(self.frame_rate > 0, "frame_rate must be positive")?;
        check(
            self.frame_width > 0 && self.frame_height > 0,
            "frame size must be positive",
        )?;
        check(
            self.detection_scale.is_finite() && self.detection_scale >= 1.0,
            "detection_scale must be at least 1",
        )?;
        check(self.pipeline_width >= 1, "pipeline_width must be at least 1")?;
        check(self.handoff_capacity >= 1, "handoff_capacity must be at least 1")?;
        for (name, params) in [("face_params", &self.face_params), ("eye_params", &self.eye_params)] {
            check(
                params.scale_factor > 1.0,
                &format!("{name}.scale_factor must be greater than 1"),
            )?;
        }
        check(
            (0.0..=1.0).contains(&self.iou_threshold),
            "iou_threshold must be within [0, 1]",
        )?;

        let layout = &self.eye_layout;
        check(
            [
                layout.top_percent,
                layout.side_percent,
                layout.width_percent,
                layout.height_percent,
            ]
            .iter()
            .all(|p| (0.0..=100.0).contains(p)),
            "eye layout percentages must be within [0, 100]",
        )?;
        check(
            layout.top_percent + layout.height_percent <= 100.0
                && 2.0 * layout.side_percent + layout.width_percent <= 100.0,
            "eye regions must fit inside the face box",
        )?;

        let eye = &self.eye_center;
        check(eye.working_width >= 3, "eye_center.working_width must be at least 3")?;
        check(
            eye.weight_blur_size % 2 == 1,
            "eye_center.weight_blur_size must be odd",
        )?;
        check(
            eye.post_process_threshold > 0.0 && eye.post_process_threshold <= 1.0,
            "eye_center.post_process_threshold must be within (0, 1]",
        )?;

        check(
            self.smoothing.face_depth >= 1 && self.smoothing.eye_depth >= 1,
            "smoothing depths must be at least 1",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid_and_documented() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_rate, 15);
        assert_eq!((config.frame_width, config.frame_height), (640, 480));
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.pipeline_width, 7);
        assert_eq!(config.handoff_capacity, 2);
        assert_eq!(config.smoothing.face_depth, 5);
        assert_eq!(config.smoothing.eye_depth, 10);
        assert_eq!(config.smoothing.eye_mode, EyeSmoothing::PerEye);
        assert_eq!(config.smoothing.averaging, AveragingMode::FixedWindow);
    }

    #[rstest]
    #[case::zero_rate(|c: &mut TrackerConfig| c.frame_rate = 0)]
    #[case::fractional_scale(|c: &mut TrackerConfig| c.detection_scale = 0.5)]
    #[case::nan_scale(|c: &mut TrackerConfig| c.detection_scale = f64::NAN)]
    #[case::zero_width(|c: &mut TrackerConfig| c.pipeline_width = 0)]
    #[case::zero_handoff(|c: &mut TrackerConfig| c.handoff_capacity = 0)]
    #[case::flat_pyramid(|c: &mut TrackerConfig| c.face_params.scale_factor = 1.0)]
    #[case::even_blur(|c: &mut TrackerConfig| c.eye_center.weight_blur_size = 4)]
    #[case::overfull_layout(|c: &mut TrackerConfig| c.eye_layout.width_percent = 80.0)]
    #[case::zero_depth(|c: &mut TrackerConfig| c.smoothing.eye_depth = 0)]
    fn test_validate_rejects(#[case] mutate: fn(&mut TrackerConfig)) {
        let mut config = TrackerConfig::default();
        mutate(&mut config);
        assert!(matches!(
            config.validate(),
            Err(TrackingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{"frame_rate": 30, "smoothing": {"eye_mode": "shared"}}"#,
        )
        .unwrap();
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.frame_width, 640);
        assert_eq!(config.smoothing.eye_mode, EyeSmoothing::Shared);
        assert_eq!(config.smoothing.eye_depth, 10);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tracker.json");
        let config = TrackerConfig {
            camera_index: 2,
            camera_device: Some("Integrated Camera".into()),
            face_model: Some(PathBuf::from("/models/face.onnx")),
            detection_scale: 2.0,
            ..TrackerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(TrackerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            TrackerConfig::load(&path),
            Err(TrackingError::InvalidConfig(_))
        ));
    }
}
