use std::time::Duration;

use crate::pipeline::frame_pipeline::{PipelineHandle, PipelineState};
use crate::pipeline::tracked_frame::TrackedFrame;

/// Destination for finished frames (window, files, log...).
///
/// Runs on the consumer's thread, never inside the pipeline.
pub trait Presenter {
    fn present(&mut self, frame: &TrackedFrame) -> Result<(), Box<dyn std::error::Error>>;

    /// Called once after the last frame. Default: no-op.
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

/// Polls a pipeline's handoff queue and feeds every frame to a presenter.
pub struct PresenterLoop {
    poll_interval: Duration,
    max_frames: Option<usize>,
}

impl PresenterLoop {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            max_frames: None,
        }
    }

    /// Requests pipeline shutdown after `limit` frames were presented.
    pub fn with_max_frames(mut self, limit: usize) -> Self {
        self.max_frames = Some(limit);
        self
    }

    /// Presents frames until the pipeline has stopped and its queue is
    /// empty. Returns the number of frames presented.
    ///
    /// A presenter error shuts the pipeline down and is returned as is.
    pub fn run(
        &self,
        handle: &PipelineHandle,
        presenter: &mut dyn Presenter,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let consumer = handle.consumer();
        let mut presented = 0;

        loop {
            if let Some(frame) = consumer.try_pop() {
                if self.max_frames.is_some_and(|limit| presented >= limit) {
                    continue;
                }
                if let Err(e) = presenter.present(&frame) {
                    handle.shutdown();
                    return Err(e);
                }
                presented += 1;
                if self.max_frames == Some(presented) {
                    log::info!("presented {presented} frames, stopping");
                    handle.shutdown();
                }
            } else if handle.state() == PipelineState::Stopped && consumer.is_empty() {
                break;
            } else {
                std::thread::sleep(self.poll_interval);
            }
        }

        presenter.finish()?;
        Ok(presented)
    }
}

impl Default for PresenterLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::domain::frame_source::FrameSource;
    use crate::detection::domain::object_detector::{DetectParams, ObjectDetector};
    use crate::pipeline::frame_pipeline::{Detectors, FramePipeline};
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
    use crate::pipeline::tracker_config::TrackerConfig;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::{DetectionSpace, Rect};
    use ndarray::ArrayView2;
    use std::sync::{Arc, Mutex};

    struct EndlessSource {
        next: usize,
        limit: Option<usize>,
    }

    impl FrameSource for EndlessSource {
        fn pull(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.limit.is_some_and(|limit| self.next >= limit) {
                return Ok(None);
            }
            let frame = Frame::filled(64, 48, [90, 90, 90], self.next);
            self.next += 1;
            Ok(Some(frame))
        }
    }

    struct NoFaces;

    impl ObjectDetector for NoFaces {
        fn detect(
            &mut self,
            _image: ArrayView2<'_, u8>,
            _params: &DetectParams,
        ) -> Result<Vec<Rect<DetectionSpace>>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Recorder {
        indices: Vec<usize>,
        finished: bool,
        fail_at: Option<usize>,
    }

    impl Presenter for Recorder {
        fn present(&mut self, frame: &TrackedFrame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_at == Some(frame.index()) {
                return Err("display closed".into());
            }
            self.indices.push(frame.index());
            Ok(())
        }

        fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.finished = true;
            Ok(())
        }
    }

    fn spawn(limit: Option<usize>) -> PipelineHandle {
        let logger: Arc<Mutex<dyn PipelineLogger>> = Arc::new(Mutex::new(NullPipelineLogger));
        FramePipeline::spawn(
            &TrackerConfig::default(),
            Box::new(EndlessSource { next: 0, limit }),
            Detectors {
                face: Box::new(NoFaces),
                eye: None,
            },
            logger,
        )
        .unwrap()
    }

    #[test]
    fn test_runs_until_end_of_stream() {
        let handle = spawn(Some(12));
        let mut recorder = Recorder::default();
        let presented = PresenterLoop::new().run(&handle, &mut recorder).unwrap();

        assert_eq!(presented, recorder.indices.len());
        assert!(recorder.finished);
        assert!(recorder.indices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(handle.join().unwrap().frames_handed_off, presented);
    }

    #[test]
    fn test_max_frames_shuts_live_source_down() {
        let handle = spawn(None);
        let mut recorder = Recorder::default();
        let presented = PresenterLoop::new()
            .with_max_frames(5)
            .run(&handle, &mut recorder)
            .unwrap();

        assert_eq!(presented, 5);
        assert_eq!(recorder.indices, vec![0, 1, 2, 3, 4]);
        assert!(handle.join().is_ok());
    }

    #[test]
    fn test_presenter_error_stops_pipeline() {
        let handle = spawn(None);
        let mut recorder = Recorder {
            fail_at: Some(3),
            ..Recorder::default()
        };
        let result = PresenterLoop::new().run(&handle, &mut recorder);

        assert!(result.is_err());
        assert_eq!(recorder.indices, vec![0, 1, 2]);
        assert!(!recorder.finished);
        assert!(handle.join().is_ok());
    }
}
