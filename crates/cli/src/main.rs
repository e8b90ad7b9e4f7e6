use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;

use eyetrack_core::acquisition::domain::frame_source::FrameSource;
use eyetrack_core::acquisition::infrastructure::image_sequence_source::ImageSequenceSource;
use eyetrack_core::pipeline::frame_pipeline::{Detectors, FramePipeline};
use eyetrack_core::pipeline::pipeline_logger::{PipelineLogger, StatsPipelineLogger};
use eyetrack_core::pipeline::tracked_frame::TrackedFrame;
use eyetrack_core::pipeline::tracker_config::TrackerConfig;
use eyetrack_core::presentation::image_directory_presenter::ImageDirectoryPresenter;
use eyetrack_core::presentation::log_presenter::LogPresenter;
use eyetrack_core::presentation::presenter::{Presenter, PresenterLoop};
use eyetrack_core::shared::constants::DEFAULT_CONFIDENCE;

/// Face and eye-center tracking on a camera, a video or a directory of frames.
#[derive(Parser)]
#[command(name = "eyetrack")]
struct Cli {
    /// Directory of image frames, read in file-name order.
    #[arg(required_unless_present_any = ["camera", "video"])]
    input: Option<PathBuf>,

    /// Capture from a camera (requires the `ffmpeg` feature).
    #[arg(long, conflicts_with_all = ["input", "video"])]
    camera: bool,

    /// Camera device index.
    #[arg(long)]
    camera_index: Option<u32>,

    /// Camera device name or path; required for DirectShow on Windows.
    #[arg(long)]
    camera_device: Option<String>,

    /// Read a video file (requires the `ffmpeg` feature).
    #[arg(long, conflicts_with = "input")]
    video: Option<PathBuf>,

    /// JSON tracker configuration; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame rate requested from the source.
    #[arg(long)]
    fps: Option<u32>,

    /// Frame width requested from the source.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height requested from the source.
    #[arg(long)]
    height: Option<u32>,

    /// Face detection model (ONNX). Resolved from the model cache when omitted.
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Optional eye detection model (ONNX).
    #[arg(long)]
    eye_model: Option<PathBuf>,

    /// Factor frames are shrunk by before detection (>= 1).
    #[arg(long)]
    scale: Option<f64>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Write annotated frames as PNG into this directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print one JSON report per frame instead of text lines.
    #[arg(long)]
    json: bool,

    /// Stop after presenting this many frames.
    #[arg(long)]
    frames: Option<usize>,

    /// Save the effective configuration to this file.
    #[arg(long)]
    save_config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }

    let config = build_config(&cli)?;
    if let Some(path) = &cli.save_config {
        config.save(path)?;
        log::info!("Configuration written to {}", path.display());
    }

    let source = open_source(&cli, &config)?;
    let detectors = build_detectors(&config, cli.confidence)?;
    let mut presenter = build_presenter(&cli)?;

    let logger: Arc<Mutex<dyn PipelineLogger>> =
        Arc::new(Mutex::new(StatsPipelineLogger::default()));
    let handle = FramePipeline::spawn(&config, source, detectors, logger)?;

    let mut presenter_loop = PresenterLoop::new();
    if let Some(limit) = cli.frames {
        presenter_loop = presenter_loop.with_max_frames(limit);
    }
    let presented = presenter_loop.run(&handle, &mut presenter);
    let report = handle.join();

    let presented = presented?;
    let report = report?;
    log::info!(
        "Presented {presented} frames ({} admitted, {} dropped)",
        report.frames_admitted,
        report.frames_dropped
    );
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<TrackerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };

    if let Some(fps) = cli.fps {
        config.frame_rate = fps;
    }
    if let Some(width) = cli.width {
        config.frame_width = width;
    }
    if let Some(height) = cli.height {
        config.frame_height = height;
    }
    if let Some(index) = cli.camera_index {
        config.camera_index = index;
    }
    if cli.camera_device.is_some() {
        config.camera_device = cli.camera_device.clone();
    }
    if let Some(scale) = cli.scale {
        config.detection_scale = scale;
    }
    if cli.face_model.is_some() {
        config.face_model = cli.face_model.clone();
    }
    if cli.eye_model.is_some() {
        config.eye_model = cli.eye_model.clone();
    }

    config.validate()?;
    Ok(config)
}

fn open_source(
    cli: &Cli,
    config: &TrackerConfig,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if cli.camera {
        return open_camera(config);
    }
    if let Some(path) = &cli.video {
        return open_video(path);
    }

    let dir = cli.input.as_ref().ok_or("No input given")?;
    if !dir.is_dir() {
        return Err(format!("Input directory not found: {}", dir.display()).into());
    }
    let source = ImageSequenceSource::open(dir)?
        .with_frame_rate(config.frame_rate)
        .with_frame_size(config.frame_width, config.frame_height);
    log::info!("Reading {} frames from {}", source.len(), dir.display());
    Ok(Box::new(source))
}

#[cfg(feature = "ffmpeg")]
fn open_camera(config: &TrackerConfig) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use eyetrack_core::acquisition::infrastructure::ffmpeg_source::{CameraSettings, FfmpegSource};

    Ok(Box::new(FfmpegSource::open_camera(CameraSettings {
        index: config.camera_index,
        device: config.camera_device.clone(),
        frame_rate: config.frame_rate,
        width: config.frame_width,
        height: config.frame_height,
    })?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_camera(_config: &TrackerConfig) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("Camera capture requires building with --features ffmpeg".into())
}

#[cfg(feature = "ffmpeg")]
fn open_video(path: &std::path::Path) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use eyetrack_core::acquisition::infrastructure::ffmpeg_source::FfmpegSource;

    Ok(Box::new(FfmpegSource::open_file(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video(_path: &std::path::Path) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("Video input requires building with --features ffmpeg".into())
}

#[cfg(feature = "onnx")]
fn build_detectors(
    config: &TrackerConfig,
    confidence: f64,
) -> Result<Detectors, Box<dyn std::error::Error>> {
    use eyetrack_core::detection::infrastructure::model_resolver;
    use eyetrack_core::detection::infrastructure::onnx_object_detector::OnnxObjectDetector;
    use eyetrack_core::shared::constants::{FACE_MODEL_NAME, FACE_MODEL_URL};

    log::info!("Resolving model: {FACE_MODEL_NAME}");
    let face_path = model_resolver::resolve_or_download(
        FACE_MODEL_NAME,
        FACE_MODEL_URL,
        config.face_model.as_deref(),
        None,
    )?;
    let face = OnnxObjectDetector::new(&face_path, confidence)?;

    let eye = match &config.eye_model {
        Some(path) => {
            let eye_path = model_resolver::resolve("eye model", Some(path), None)?;
            let detector: Box<dyn eyetrack_core::detection::domain::object_detector::ObjectDetector> =
                Box::new(OnnxObjectDetector::new(&eye_path, confidence)?);
            Some(detector)
        }
        None => None,
    };

    Ok(Detectors {
        face: Box::new(face),
        eye,
    })
}

#[cfg(not(feature = "onnx"))]
fn build_detectors(
    _config: &TrackerConfig,
    _confidence: f64,
) -> Result<Detectors, Box<dyn std::error::Error>> {
    Err("No detector backend available; rebuild with --features onnx".into())
}

/// Forwards each frame to several presenters in order.
struct Presenters(Vec<Box<dyn Presenter>>);

impl Presenter for Presenters {
    fn present(&mut self, frame: &TrackedFrame) -> Result<(), Box<dyn std::error::Error>> {
        for presenter in &mut self.0 {
            presenter.present(frame)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        for presenter in &mut self.0 {
            presenter.finish()?;
        }
        Ok(())
    }
}

fn build_presenter(cli: &Cli) -> Result<Presenters, Box<dyn std::error::Error>> {
    let mut presenters: Vec<Box<dyn Presenter>> = Vec::new();
    if let Some(dir) = &cli.output {
        presenters.push(Box::new(ImageDirectoryPresenter::new(dir)?));
    }
    if cli.output.is_none() || cli.json {
        presenters.push(Box::new(LogPresenter::stdout(cli.json)));
    }
    Ok(Presenters(presenters))
}
