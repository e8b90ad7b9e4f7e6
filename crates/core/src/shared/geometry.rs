use std::fmt::Debug;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// Marker for a named pixel coordinate space.
///
/// Rectangles and points carry their space in the type so that mixing
/// spaces without an explicit scale conversion does not compile.
pub trait CoordinateSpace:
    Copy + Clone + Debug + Default + PartialEq + Eq + Send + Sync + 'static
{
}

/// Pixel coordinates of the full-resolution acquired frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSpace;

/// Pixel coordinates of the downscaled buffer the coarse detector runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectionSpace;

/// Pixel coordinates of the canonical eye working buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EyeSpace;

impl CoordinateSpace for FrameSpace {}
impl CoordinateSpace for DetectionSpace {}
impl CoordinateSpace for EyeSpace {}

/// Axis-aligned integer box in coordinate space `S`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect<S: CoordinateSpace> {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    space: PhantomData<S>,
}

/// Integer point in coordinate space `S`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point<S: CoordinateSpace> {
    pub x: i32,
    pub y: i32,
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Point<S> {
    pub const fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl<S: CoordinateSpace> Rect<S> {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            space: PhantomData,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn origin(&self) -> Point<S> {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point<S> {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// True when the box lies entirely inside a `width` × `height` buffer.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() as i64 <= width as i64
            && self.bottom() as i64 <= height as i64
    }

    /// Intersection with a `width` × `height` buffer, `None` when nothing
    /// of the box remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.right() as i64).min(width as i64) as i32;
        let y2 = (self.bottom() as i64).min(height as i64) as i32;
        let clamped = Self::new(x1, y1, x2 - x1, y2 - y1);
        (!clamped.is_empty()).then_some(clamped)
    }

    pub fn iou(&self, other: &Self) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.area() as f64;
        let area_b = other.area() as f64;
        inter / (area_a + area_b - inter)
    }

    /// Greedy deduplication: keeps a box only if its IoU with every
    /// previously-kept box is at or below the threshold. Order is preserved.
    pub fn deduplicate(rects: &[Self], iou_threshold: f64) -> Vec<Self> {
        let mut kept: Vec<Self> = Vec::with_capacity(rects.len());
        for r in rects {
            if !kept.iter().any(|k| r.iou(k) > iou_threshold) {
                kept.push(*r);
            }
        }
        kept
    }
}

impl Rect<DetectionSpace> {
    /// Maps a detection-space box onto the full frame, where `scale` is the
    /// factor the frame was divided by before detection.
    pub fn to_frame_space(&self, scale: f64) -> Rect<FrameSpace> {
        Rect::new(
            (self.x as f64 * scale).round() as i32,
            (self.y as f64 * scale).round() as i32,
            (self.width as f64 * scale).round() as i32,
            (self.height as f64 * scale).round() as i32,
        )
    }
}

/// Serializable plain form used when rectangles cross a process boundary
/// (logs, JSON output). Carries no space information by itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectRecord {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl<S: CoordinateSpace> From<Rect<S>> for RectRecord {
    fn from(r: Rect<S>) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: i32,
    pub y: i32,
}

impl<S: CoordinateSpace> From<Point<S>> for PointRecord {
    fn from(p: Point<S>) -> Self {
        Self { x: p.x, y: p.y }
    }
}
