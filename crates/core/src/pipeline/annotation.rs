use crate::eye_center::estimator::EyeCenterEstimator;
use crate::shared::geometry::{DetectionSpace, FrameSpace, Point, Rect};
use crate::tracking::eye_regions::{EyeRegionLayout, EyeSide};
use crate::tracking::temporal_smoother::TemporalSmoother;

use super::drawing::{draw_rect, fill_circle, palette_color};
use super::tracked_frame::{EyeObservation, FaceObservation, TrackedFrame};
use super::tracker_config::{EyeSmoothing, TrackerConfig};

const FACE_THICKNESS: u32 = 3;
const EYE_THICKNESS: u32 = 1;
const CENTER_RADIUS: u32 = 2;

/// Turns detections into smoothed faces and eye centers, then draws them.
///
/// Owns every smoothing history, so it must live on a single thread; the
/// pipeline gives it to the annotation stage.
pub struct FrameAnnotator {
    detection_scale: f64,
    layout: EyeRegionLayout,
    estimator: EyeCenterEstimator,
    face_smoother: TemporalSmoother<Rect<FrameSpace>>,
    eye_smoothers: Vec<TemporalSmoother<Point<FrameSpace>>>,
    eye_mode: EyeSmoothing,
}

impl FrameAnnotator {
    pub fn new(config: &TrackerConfig) -> Self {
        let smoothing = &config.smoothing;
        let eye_histories = match smoothing.eye_mode {
            EyeSmoothing::PerEye => EyeSide::BOTH.len(),
            EyeSmoothing::Shared => 1,
        };
        Self {
            detection_scale: config.detection_scale,
            layout: config.eye_layout.clone(),
            estimator: EyeCenterEstimator::new(config.eye_center.clone()),
            face_smoother: TemporalSmoother::new(smoothing.face_depth, smoothing.averaging),
            eye_smoothers: (0..eye_histories)
                .map(|_| TemporalSmoother::new(smoothing.eye_depth, smoothing.averaging))
                .collect(),
            eye_mode: smoothing.eye_mode,
        }
    }

    pub fn annotate(&mut self, frame: &mut TrackedFrame) {
        let mut faces = Vec::with_capacity(frame.face_candidates.len());

        for (i, candidate) in frame.face_candidates.iter().enumerate() {
            let detected = candidate.to_frame_space(self.detection_scale);
            let smoothed = self.face_smoother.push(detected);

            let nested = frame.eye_candidates.get(i).map(Vec::as_slice).unwrap_or(&[]);
            let regions = self.eye_regions(smoothed, nested);

            let mut eyes = Vec::with_capacity(regions.len());
            for (side, region) in regions {
                let raw_center = match self.estimator.estimate(frame.gray.view(), region) {
                    Ok(center) => Some(center),
                    Err(e) => {
                        log::debug!("frame {}: skipping {side:?} eye: {e}", frame.image.index());
                        None
                    }
                };
                let center = raw_center.map(|c| self.eye_smoother(side).push(c));
                eyes.push(EyeObservation {
                    side,
                    region,
                    raw_center,
                    center,
                });
            }

            faces.push(FaceObservation {
                detected,
                smoothed,
                eyes,
            });
        }

        for (i, face) in faces.iter().enumerate() {
            let color = palette_color(i);
            draw_rect(&mut frame.image, face.smoothed, color, FACE_THICKNESS);
            for eye in &face.eyes {
                draw_rect(&mut frame.image, eye.region, color, EYE_THICKNESS);
                if let Some(center) = eye.center {
                    fill_circle(&mut frame.image, center, CENTER_RADIUS, color);
                }
            }
        }

        frame.faces = faces;
    }

    /// Nested detections when present (at most two, left to right),
    /// otherwise the fixed layout of the smoothed face.
    fn eye_regions(
        &self,
        face: Rect<FrameSpace>,
        nested: &[Rect<DetectionSpace>],
    ) -> Vec<(EyeSide, Rect<FrameSpace>)> {
        if nested.is_empty() {
            return self.layout.regions(face).to_vec();
        }

        let mut eyes: Vec<Rect<FrameSpace>> = nested
            .iter()
            .take(2)
            .map(|r| r.to_frame_space(self.detection_scale))
            .collect();
        eyes.sort_by_key(|r| r.x);

        match eyes.as_slice() {
            [left, right] => vec![(EyeSide::Left, *left), (EyeSide::Right, *right)],
            [only] => {
                let side = if only.center().x < face.center().x {
                    EyeSide::Left
                } else {
                    EyeSide::Right
                };
                vec![(side, *only)]
            }
            _ => Vec::new(),
        }
    }

    fn eye_smoother(&mut self, side: EyeSide) -> &mut TemporalSmoother<Point<FrameSpace>> {
        let slot = match self.eye_mode {
            EyeSmoothing::PerEye => side.index(),
            EyeSmoothing::Shared => 0,
        };
        &mut self.eye_smoothers[slot]
    }
}
