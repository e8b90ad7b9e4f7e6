pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const DEFAULT_FRAME_RATE: u32 = 15;
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
pub const DEFAULT_CAMERA_INDEX: u32 = 0;

/// Factor the grayscale frame is divided by before coarse detection.
pub const DEFAULT_DETECTION_SCALE: f64 = 1.0;
/// Minimum detector score for a box to be kept.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// Frames allowed in flight at once; one per pipeline stage.
pub const DEFAULT_PIPELINE_WIDTH: usize = 7;

pub const HANDOFF_CAPACITY: usize = 2;

pub const FACE_HISTORY_DEPTH: usize = 5;
pub const EYE_HISTORY_DEPTH: usize = 10;

/// Canonical width every eye region is rescaled to before voting.
pub const FAST_EYE_WIDTH: u32 = 50;
pub const GRADIENT_THRESHOLD: f64 = 50.0;
pub const WEIGHT_BLUR_SIZE: usize = 5;
pub const POST_PROCESS_THRESHOLD: f64 = 0.97;

// Eye regions as percentages of the face box.
pub const EYE_PERCENT_TOP: f64 = 25.0;
pub const EYE_PERCENT_SIDE: f64 = 13.0;
pub const EYE_PERCENT_WIDTH: f64 = 35.0;
pub const EYE_PERCENT_HEIGHT: f64 = 30.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
