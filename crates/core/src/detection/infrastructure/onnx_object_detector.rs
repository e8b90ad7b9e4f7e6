/// Single-class YOLO box detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing of the grayscale buffer, inference and
/// NMS post-processing. Works with face models and with eye models exported
/// in the same `[cx, cy, w, h, conf, ...]` layout.
use std::path::Path;

use ndarray::ArrayView2;

use crate::detection::domain::object_detector::{DetectParams, ObjectDetector};
use crate::shared::error::TrackingError;
use crate::shared::geometry::{DetectionSpace, Rect};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxObjectDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxObjectDetector {
    /// Load a model and prepare for inference.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, TrackingError> {
        let session = build_session(model_path).map_err(|e| TrackingError::ModelLoad {
            path: model_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "loaded detector model {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    Ok(ort::session::Session::builder()?
        .with_execution_providers(platform_execution_providers())?
        .commit_from_file(model_path)?)
}

/// Hardware providers tried before ONNX Runtime's CPU fallback.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    let providers = vec![ort::execution_providers::CoreMLExecutionProvider::default().build()];
    #[cfg(target_os = "windows")]
    let providers = vec![ort::execution_providers::DirectMLExecutionProvider::default().build()];
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let providers = Vec::new();
    providers
}

impl ObjectDetector for OnnxObjectDetector {
    /// `scale_factor` and `min_neighbors` have no counterpart in a single-pass
    /// network; `min_size` filters the reported boxes.
    fn detect(
        &mut self,
        image: ArrayView2<'_, u8>,
        params: &DetectParams,
    ) -> Result<Vec<Rect<DetectionSpace>>, Box<dyn std::error::Error>> {
        let (ih, iw) = image.dim();
        if ih == 0 || iw == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, scale, pad_x, pad_y) = letterbox(image, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("detector model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();

        // [1, features, detections] (transposed) or [1, detections, features].
        if shape.len() != 3 {
            return Err(format!("unexpected detector output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Ok(Vec::new());
        }

        let tensor = tensor.as_standard_layout();
        let data = tensor.as_slice().ok_or("cannot get tensor slice")?;
        let feature = |det: usize, f: usize| -> f64 {
            if transposed {
                data[f * num_dets + det] as f64
            } else {
                data[det * num_feats + f] as f64
            }
        };

        let mut raw = Vec::new();
        for i in 0..num_dets {
            let conf = feature(i, 4);
            if conf < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
            raw.push(RawDetection {
                bbox: [
                    (cx - w / 2.0 - pad_x as f64) / scale,
                    (cy - h / 2.0 - pad_y as f64) / scale,
                    (cx + w / 2.0 - pad_x as f64) / scale,
                    (cy + h / 2.0 - pad_y as f64) / scale,
                ],
                confidence: conf,
            });
        }

        let kept = nms(&mut raw, NMS_IOU_THRESH);
        Ok(kept
            .iter()
            .filter_map(|d| to_rect(d.bbox, iw, ih))
            .filter(|r| params.admits(r.width, r.height))
            .collect())
    }
}

/// Rounds `[x1, y1, x2, y2]` to a box clamped to the buffer.
fn to_rect(bbox: [f64; 4], width: usize, height: usize) -> Option<Rect<DetectionSpace>> {
    let x1 = bbox[0].round() as i32;
    let y1 = bbox[1].round() as i32;
    let x2 = bbox[2].round() as i32;
    let y2 = bbox[3].round() as i32;
    Rect::new(x1, y1, x2 - x1, y2 - y1).clamp_to(width as u32, height as u32)
}

/// Letterbox-resize a grayscale buffer to `target_size` × `target_size`,
/// replicating the single channel into three.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(image: ArrayView2<'_, u8>, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let (src_h, src_w) = image.dim();
    let target = target_size as f64;

    let scale = (target / src_w as f64).min(target / src_h as f64);
    let new_w = ((src_w as f64 * scale).round() as u32).min(target_size);
    let new_h = ((src_h as f64 * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);

    // Nearest-neighbor resize into the padded region.
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let v = image[[src_y, src_x]] as f32 / 255.0;
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = v;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

#[derive(Clone, Debug)]
struct RawDetection {
    bbox: [f64; 4],
    confidence: f64,
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| bbox_iou(&k.bbox, &det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
