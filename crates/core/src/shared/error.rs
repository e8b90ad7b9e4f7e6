use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy of the tracker.
///
/// `DegenerateRegion` is recoverable: the annotation stage skips the affected
/// face or eye for that frame. Every other variant ends the pipeline run.
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("frame acquisition failed: {0}")]
    Acquisition(String),
    #[error("failed to load detector model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },
    #[error("degenerate region {width}x{height} at ({x}, {y}) in a {bounds_width}x{bounds_height} buffer")]
    DegenerateRegion {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        bounds_width: u32,
        bounds_height: u32,
    },
    #[error("object detection failed: {0}")]
    Detection(String),
    #[error("handoff to presenter failed: {0}")]
    Handoff(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to spawn {stage} thread: {source}")]
    ThreadSpawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} stage panicked")]
    StagePanicked(&'static str),
}

impl TrackingError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TrackingError::DegenerateRegion { .. })
    }
}
