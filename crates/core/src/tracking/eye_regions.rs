use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    EYE_PERCENT_HEIGHT, EYE_PERCENT_SIDE, EYE_PERCENT_TOP, EYE_PERCENT_WIDTH,
};
use crate::shared::geometry::{FrameSpace, Rect};

/// Which eye, as seen in the image (left = smaller x).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    pub const BOTH: [EyeSide; 2] = [EyeSide::Left, EyeSide::Right];

    pub fn index(self) -> usize {
        match self {
            EyeSide::Left => 0,
            EyeSide::Right => 1,
        }
    }
}

/// Eye search regions as percentages of the face box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeRegionLayout {
    pub top_percent: f64,
    pub side_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
}

impl Default for EyeRegionLayout {
    fn default() -> Self {
        Self {
            top_percent: EYE_PERCENT_TOP,
            side_percent: EYE_PERCENT_SIDE,
            width_percent: EYE_PERCENT_WIDTH,
            height_percent: EYE_PERCENT_HEIGHT,
        }
    }
}

impl EyeRegionLayout {
    /// Left and right eye regions of `face`, in frame space.
    ///
    /// Both regions share the same top offset and size; the left one is
    /// inset from the face's left edge and the right one mirrors it.
    pub fn regions(&self, face: Rect<FrameSpace>) -> [(EyeSide, Rect<FrameSpace>); 2] {
        let fw = face.width as f64;
        let fh = face.height as f64;
        let width = (fw * self.width_percent / 100.0) as i32;
        let height = (fh * self.height_percent / 100.0) as i32;
        let top = (fh * self.top_percent / 100.0) as i32;
        let side = (fw * self.side_percent / 100.0) as i32;

        let left = Rect::new(face.x + side, face.y + top, width, height);
        let right = Rect::new(face.x + face.width - width - side, face.y + top, width, height);
        [(EyeSide::Left, left), (EyeSide::Right, right)]
    }
}
