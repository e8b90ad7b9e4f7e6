//! The seven-stage tracking pipeline and the types that travel through it.

pub mod annotation;
pub mod cancellation;
pub mod drawing;
pub mod frame_pipeline;
pub mod handoff_queue;
pub mod pipeline_logger;
pub mod tracked_frame;
pub mod tracker_config;

pub use frame_pipeline::{Detectors, FramePipeline, PipelineHandle, PipelineReport, PipelineState};
pub use handoff_queue::HandoffConsumer;
pub use tracked_frame::{FrameReport, TrackedFrame};
pub use tracker_config::TrackerConfig;
