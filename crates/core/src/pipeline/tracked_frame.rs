use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;
use crate::shared::geometry::{DetectionSpace, FrameSpace, Point, PointRecord, Rect, RectRecord};
use crate::tracking::eye_regions::EyeSide;

/// One eye of an annotated face.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EyeObservation {
    pub side: EyeSide,
    pub region: Rect<FrameSpace>,
    /// Unsmoothed estimate; `None` when the region was degenerate.
    pub raw_center: Option<Point<FrameSpace>>,
    pub center: Option<Point<FrameSpace>>,
}

/// One annotated face.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceObservation {
    /// Detector output rescaled to frame space.
    pub detected: Rect<FrameSpace>,
    pub smoothed: Rect<FrameSpace>,
    pub eyes: Vec<EyeObservation>,
}

/// Unit of work travelling through the pipeline.
///
/// Created at acquisition with only `image` set; each stage fills in its
/// buffers or results. Consumers receive it fully annotated.
#[derive(Clone, Debug)]
pub struct TrackedFrame {
    /// Color frame; the annotation stage draws into it.
    pub image: Frame,
    pub gray: Array2<u8>,
    /// Downscaled, then equalized, grayscale buffer the detectors run on.
    pub small: Array2<u8>,
    pub face_candidates: Vec<Rect<DetectionSpace>>,
    /// Nested eye detections, one list per face candidate.
    pub eye_candidates: Vec<Vec<Rect<DetectionSpace>>>,
    pub faces: Vec<FaceObservation>,
}

impl TrackedFrame {
    pub fn new(image: Frame) -> Self {
        Self {
            image,
            gray: Array2::zeros((0, 0)),
            small: Array2::zeros((0, 0)),
            face_candidates: Vec::new(),
            eye_candidates: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.image.index()
    }

    pub fn report(&self) -> FrameReport {
        FrameReport {
            index: self.index(),
            faces: self
                .faces
                .iter()
                .map(|face| FaceReport {
                    face: face.smoothed.into(),
                    eyes: face
                        .eyes
                        .iter()
                        .map(|eye| EyeReport {
                            side: eye.side,
                            region: eye.region.into(),
                            center: eye.center.map(PointRecord::from),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Serializable summary of one tracked frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    pub index: usize,
    pub faces: Vec<FaceReport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceReport {
    pub face: RectRecord,
    pub eyes: Vec<EyeReport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeReport {
    pub side: EyeSide,
    pub region: RectRecord,
    pub center: Option<PointRecord>,
}
