use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};

use super::center_voter::{arg_max, vote};
use super::edge_filter::filtered_maximum;
use super::gradient::{dynamic_threshold, GradientField};
use crate::imaging::gaussian::{blur_gray, gaussian_kernel_1d};
use crate::imaging::resize::resize_bilinear;
use crate::shared::constants::{
    FAST_EYE_WIDTH, GRADIENT_THRESHOLD, POST_PROCESS_THRESHOLD, WEIGHT_BLUR_SIZE,
};
use crate::shared::error::TrackingError;
use crate::shared::geometry::{EyeSpace, FrameSpace, Point, Rect};

/// Regions taller than this many working widths are squeezed vertically.
const MAX_WORKING_ASPECT: usize = 2;

/// Tunables of the gradient-voting eye-center estimator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeCenterConfig {
    /// Canonical width every eye crop is rescaled to.
    pub working_width: u32,
    pub gradient_threshold: f64,
    /// Odd kernel size of the blur that produces the intensity weight.
    pub weight_blur_size: usize,
    pub post_process: bool,
    pub post_process_threshold: f64,
}

impl Default for EyeCenterConfig {
    fn default() -> Self {
        Self {
            working_width: FAST_EYE_WIDTH,
            gradient_threshold: GRADIENT_THRESHOLD,
            weight_blur_size: WEIGHT_BLUR_SIZE,
            post_process: true,
            post_process_threshold: POST_PROCESS_THRESHOLD,
        }
    }
}

/// Locates the pupil center inside an eye region of a grayscale frame.
pub struct EyeCenterEstimator {
    config: EyeCenterConfig,
    weight_kernel: Vec<f32>,
}

impl EyeCenterEstimator {
    pub fn new(config: EyeCenterConfig) -> Self {
        let weight_kernel = gaussian_kernel_1d(config.weight_blur_size, 0.0);
        Self {
            config,
            weight_kernel,
        }
    }

    pub fn config(&self) -> &EyeCenterConfig {
        &self.config
    }

    /// Estimated eye center in `frame_gray` coordinates.
    ///
    /// `region` must have positive area and lie inside `frame_gray`.
    pub fn estimate(
        &self,
        frame_gray: ArrayView2<'_, u8>,
        region: Rect<FrameSpace>,
    ) -> Result<Point<FrameSpace>, TrackingError> {
        let (rows, cols) = frame_gray.dim();
        if region.is_empty() || !region.fits_within(cols as u32, rows as u32) {
            return Err(TrackingError::DegenerateRegion {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                bounds_width: cols as u32,
                bounds_height: rows as u32,
            });
        }

        let crop = frame_gray.slice(s![
            region.y as usize..region.bottom() as usize,
            region.x as usize..region.right() as usize
        ]);

        let working_width = self.config.working_width.max(1) as usize;
        let (working_height, row_ratio) = working_rows(working_width, region.width, region.height);
        let working = resize_bilinear(crop, working_width, working_height);

        let mut field = GradientField::of(working.mapv(f64::from).view());
        let magnitudes = field.magnitude();
        let threshold = dynamic_threshold(magnitudes.view(), self.config.gradient_threshold);
        field.normalize(magnitudes.view(), threshold);

        let weight = blur_gray(&working, &self.weight_kernel).mapv(|v| 255 - v);
        let likelihood = vote(&field, weight.view());

        let peak = if self.config.post_process {
            filtered_maximum(likelihood.view(), self.config.post_process_threshold)
        } else {
            arg_max(likelihood.view(), None)
        };
        // The working buffer always has at least one cell.
        let (row, col) = peak.unwrap_or((0, 0));

        let local: Point<EyeSpace> = Point::new(col as i32, row as i32);
        let col_ratio = working_width as f64 / region.width as f64;
        Ok(unscale(local, col_ratio, row_ratio, region))
    }
}

impl Default for EyeCenterEstimator {
    fn default() -> Self {
        Self::new(EyeCenterConfig::default())
    }
}

/// Working-buffer rows and the vertical frame-to-working ratio.
///
/// Rows are `floor(working_width / width * height)`, at least one, and share
/// the horizontal ratio. Past `MAX_WORKING_ASPECT` working widths the region
/// is squeezed to that many rows instead.
fn working_rows(working_width: usize, width: i32, height: i32) -> (usize, f64) {
    let ratio = working_width as f64 / width as f64;
    let rows = (ratio * height as f64).floor() as usize;
    let max_rows = working_width * MAX_WORKING_ASPECT;
    if rows > max_rows {
        (max_rows, max_rows as f64 / height as f64)
    } else {
        (rows.max(1), ratio)
    }
}

/// Maps a working-buffer point back into frame space.
fn unscale(
    point: Point<EyeSpace>,
    col_ratio: f64,
    row_ratio: f64,
    region: Rect<FrameSpace>,
) -> Point<FrameSpace> {
    Point::new(
        (point.x as f64 / col_ratio).round() as i32 + region.x,
        (point.y as f64 / row_ratio).round() as i32 + region.y,
    )
}
