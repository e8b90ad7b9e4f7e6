use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::shared::geometry::{DetectionSpace, Rect};

/// Multi-scale search parameters passed to every detector call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectParams {
    /// Step between successive search scales (> 1).
    pub scale_factor: f64,
    /// Overlapping raw hits required before a candidate is reported.
    pub min_neighbors: u32,
    /// Smallest reported box as `(width, height)`.
    pub min_size: (u32, u32),
}

impl DetectParams {
    pub const FACE: DetectParams = DetectParams {
        scale_factor: 1.05,
        min_neighbors: 3,
        min_size: (30, 30),
    };

    pub const EYE: DetectParams = DetectParams {
        scale_factor: 1.1,
        min_neighbors: 3,
        min_size: (30, 30),
    };

    /// True when a `width` × `height` box meets `min_size`.
    pub fn admits(&self, width: i32, height: i32) -> bool {
        width >= self.min_size.0 as i32 && height >= self.min_size.1 as i32
    }
}

/// Domain interface for coarse bounding-box detection.
///
/// Runs on an equalized grayscale buffer and reports boxes in that buffer's
/// coordinates. Implementations must be deterministic for identical inputs;
/// `&mut self` allows reusing inference scratch state.
pub trait ObjectDetector: Send {
    fn detect(
        &mut self,
        image: ArrayView2<'_, u8>,
        params: &DetectParams,
    ) -> Result<Vec<Rect<DetectionSpace>>, Box<dyn std::error::Error>>;
}
