use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{select_biased, Receiver, Sender};
use ndarray::{s, ArrayView2};

use crate::acquisition::domain::frame_source::FrameSource;
use crate::detection::domain::object_detector::{DetectParams, ObjectDetector};
use crate::imaging::grayscale::to_grayscale;
use crate::imaging::histogram::equalize_histogram;
use crate::imaging::resize::downscale;
use crate::shared::error::TrackingError;
use crate::shared::geometry::{DetectionSpace, Rect};

use super::annotation::FrameAnnotator;
use super::cancellation::Cancellation;
use super::handoff_queue::{handoff_queue, HandoffConsumer, HandoffProducer, PushOutcome};
use super::pipeline_logger::PipelineLogger;
use super::tracked_frame::TrackedFrame;
use super::tracker_config::TrackerConfig;

/// Nested eye detection keeps at most this many candidates per face.
const MAX_EYES: usize = 2;

/// Lifecycle of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    /// Cancelled; in-flight frames are finishing but nothing new is admitted.
    Draining,
    /// Every stage thread has exited.
    Stopped,
}

/// Frame accounting of a finished run.
///
/// `frames_admitted == frames_handed_off + frames_dropped` once joined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub frames_admitted: usize,
    pub frames_handed_off: usize,
    pub frames_dropped: usize,
}

/// Slot in the in-flight budget; returned to the pool on drop.
struct Token {
    pool: Sender<()>,
}

impl Drop for Token {
    fn drop(&mut self) {
        let _ = self.pool.try_send(());
    }
}

/// A frame plus the budget slot it occupies.
struct InFlight {
    frame: TrackedFrame,
    _token: Token,
}

/// State shared by every stage thread of one run.
struct RunState {
    cancellation: Cancellation,
    first_error: Mutex<Option<TrackingError>>,
    logger: Arc<Mutex<dyn PipelineLogger>>,
    admitted: AtomicUsize,
    handed_off: AtomicUsize,
    dropped: AtomicUsize,
}

impl RunState {
    fn cancel(&self) {
        self.cancellation.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Records `error` unless an earlier one is already stored, then cancels.
    fn fail(&self, stage: &str, error: TrackingError) {
        log::error!("{stage} stage failed: {error}");
        if let Ok(mut slot) = self.first_error.lock() {
            slot.get_or_insert(error);
        }
        self.cancel();
    }

    fn timing(&self, stage: &str, started: Instant) {
        if let Ok(mut logger) = self.logger.lock() {
            logger.timing(stage, started.elapsed().as_secs_f64() * 1000.0);
        }
    }

    fn with_logger(&self, f: impl FnOnce(&mut dyn PipelineLogger)) {
        if let Ok(mut logger) = self.logger.lock() {
            f(&mut *logger);
        }
    }

    fn report(&self) -> PipelineReport {
        PipelineReport {
            frames_admitted: self.admitted.load(Ordering::Acquire),
            frames_handed_off: self.handed_off.load(Ordering::Acquire),
            frames_dropped: self.dropped.load(Ordering::Acquire),
        }
    }
}

/// Detectors for stage 5. The eye detector is optional.
pub struct Detectors {
    pub face: Box<dyn ObjectDetector>,
    pub eye: Option<Box<dyn ObjectDetector>>,
}

/// Seven-stage tracking pipeline.
///
/// Layout: `acquire → grayscale → downscale → equalize → detect → annotate → handoff`
///
/// Each stage owns a thread; neighbours are joined by channels of capacity
/// one, and a token pool caps the frames in flight at `pipeline_width`.
/// Frames reach the handoff queue in admission order.
pub struct FramePipeline;

impl FramePipeline {
    /// Validates `config`, starts every stage and returns the run handle.
    pub fn spawn(
        config: &TrackerConfig,
        source: Box<dyn FrameSource>,
        detectors: Detectors,
        logger: Arc<Mutex<dyn PipelineLogger>>,
    ) -> Result<PipelineHandle, TrackingError> {
        config.validate()?;

        let run = Arc::new(RunState {
            cancellation: Cancellation::new(),
            first_error: Mutex::new(None),
            logger,
            admitted: AtomicUsize::new(0),
            handed_off: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        });
        let (producer, consumer) = handoff_queue(config.handoff_capacity);

        let mut threads = Vec::with_capacity(7);
        if let Err(e) = spawn_stages(config, source, detectors, producer, &run, &mut threads) {
            run.cancel();
            return Err(e);
        }

        log::info!(
            "pipeline started: width {}, detection scale {}",
            config.pipeline_width,
            config.detection_scale
        );
        Ok(PipelineHandle {
            threads,
            run,
            consumer,
        })
    }
}

type StageThreads = Vec<(&'static str, JoinHandle<()>)>;

fn spawn_stages(
    config: &TrackerConfig,
    source: Box<dyn FrameSource>,
    detectors: Detectors,
    producer: HandoffProducer,
    run: &Arc<RunState>,
    threads: &mut StageThreads,
) -> Result<(), TrackingError> {
    let (acquired_tx, acquired_rx) = crossbeam_channel::bounded::<InFlight>(1);
    let (gray_tx, gray_rx) = crossbeam_channel::bounded::<InFlight>(1);
    let (small_tx, small_rx) = crossbeam_channel::bounded::<InFlight>(1);
    let (equalized_tx, equalized_rx) = crossbeam_channel::bounded::<InFlight>(1);
    let (detected_tx, detected_rx) = crossbeam_channel::bounded::<InFlight>(1);
    let (annotated_tx, annotated_rx) = crossbeam_channel::bounded::<InFlight>(1);

    threads.push((
        "acquire",
        spawn_acquire(source, config.pipeline_width, acquired_tx, Arc::clone(run))?,
    ));

    threads.push((
        "grayscale",
        spawn_stage("grayscale", acquired_rx, gray_tx, Arc::clone(run), |frame| {
            frame.gray = to_grayscale(&frame.image);
            Ok(())
        })?,
    ));

    let scale = config.detection_scale;
    threads.push((
        "downscale",
        spawn_stage("downscale", gray_rx, small_tx, Arc::clone(run), move |frame| {
            frame.small = downscale(frame.gray.view(), scale);
            Ok(())
        })?,
    ));

    threads.push((
        "equalize",
        spawn_stage("equalize", small_rx, equalized_tx, Arc::clone(run), |frame| {
            equalize_histogram(&mut frame.small);
            Ok(())
        })?,
    ));

    let mut detect = DetectStage {
        detectors,
        face_params: config.face_params,
        eye_params: config.eye_params,
        iou_threshold: config.iou_threshold,
    };
    threads.push((
        "detect",
        spawn_stage("detect", equalized_rx, detected_tx, Arc::clone(run), move |frame| {
            detect.run(frame)
        })?,
    ));

    let mut annotator = FrameAnnotator::new(config);
    let annotate_run = Arc::clone(run);
    threads.push((
        "annotate",
        spawn_stage("annotate", detected_rx, annotated_tx, Arc::clone(run), move |frame| {
            annotator.annotate(frame);
            let faces = frame.faces.len() as f64;
            annotate_run.with_logger(|logger| logger.metric("faces", faces));
            Ok(())
        })?,
    ));

    threads.push(("handoff", spawn_handoff(annotated_rx, producer, Arc::clone(run))?));
    Ok(())
}

fn spawn_thread(
    stage: &'static str,
    body: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, TrackingError> {
    std::thread::Builder::new()
        .name(format!("eyetrack-{stage}"))
        .spawn(body)
        .map_err(|source| TrackingError::ThreadSpawn { stage, source })
}

/// Stage 1: admits frames while tokens are available and nobody cancelled.
fn spawn_acquire(
    mut source: Box<dyn FrameSource>,
    width: usize,
    output: Sender<InFlight>,
    run: Arc<RunState>,
) -> Result<JoinHandle<()>, TrackingError> {
    let (pool_tx, pool_rx) = crossbeam_channel::bounded::<()>(width);
    for _ in 0..width {
        let _ = pool_tx.try_send(());
    }

    spawn_thread("acquire", move || {
        while let Some(token) = take_token(&pool_tx, &pool_rx, &run) {
            let started = Instant::now();
            let pulled = source.pull();
            run.timing("acquire", started);

            match pulled {
                Ok(Some(image)) => {
                    run.admitted.fetch_add(1, Ordering::AcqRel);
                    let envelope = InFlight {
                        frame: TrackedFrame::new(image),
                        _token: token,
                    };
                    if output.send(envelope).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("end of stream after {} frames", run.admitted.load(Ordering::Acquire));
                    run.cancel();
                    break;
                }
                Err(e) => {
                    run.fail("acquire", TrackingError::Acquisition(e.to_string()));
                    break;
                }
            }
        }
    })
}

/// Blocks for a free token, or returns `None` once the run is cancelled.
fn take_token(pool_tx: &Sender<()>, pool_rx: &Receiver<()>, run: &RunState) -> Option<Token> {
    if run.is_cancelled() {
        return None;
    }
    select_biased! {
        recv(run.cancellation.signal()) -> _ => None,
        recv(pool_rx) -> token => token.ok().map(|()| Token {
            pool: pool_tx.clone(),
        }),
    }
}

/// Stages 2 to 6: apply `work` to each frame and pass it on.
///
/// A failed frame is dropped (releasing its token) after the error is
/// recorded; the stage keeps draining so upstream never blocks.
fn spawn_stage<F>(
    stage: &'static str,
    input: Receiver<InFlight>,
    output: Sender<InFlight>,
    run: Arc<RunState>,
    mut work: F,
) -> Result<JoinHandle<()>, TrackingError>
where
    F: FnMut(&mut TrackedFrame) -> Result<(), TrackingError> + Send + 'static,
{
    spawn_thread(stage, move || {
        for mut envelope in input {
            let started = Instant::now();
            let result = work(&mut envelope.frame);
            run.timing(stage, started);

            match result {
                Ok(()) => {
                    if output.send(envelope).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    run.dropped.fetch_add(1, Ordering::AcqRel);
                    run.fail(stage, e);
                }
            }
        }
    })
}

/// Stage 7: pushes finished frames to the consumer unless cancelled.
fn spawn_handoff(
    input: Receiver<InFlight>,
    producer: HandoffProducer,
    run: Arc<RunState>,
) -> Result<JoinHandle<()>, TrackingError> {
    spawn_thread("handoff", move || {
        for InFlight { frame, _token } in input {
            let index = frame.index();
            if run.is_cancelled() {
                run.dropped.fetch_add(1, Ordering::AcqRel);
            } else {
                let started = Instant::now();
                let pushed = producer.push(frame, &run.cancellation);
                run.timing("handoff", started);
                match pushed {
                    Ok(PushOutcome::Delivered) => {
                        run.handed_off.fetch_add(1, Ordering::AcqRel);
                    }
                    Ok(PushOutcome::Abandoned) => {
                        run.dropped.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(e) => {
                        run.dropped.fetch_add(1, Ordering::AcqRel);
                        run.fail("handoff", e);
                    }
                }
            }
            run.with_logger(|logger| logger.frame_done(index));
        }
    })
}

/// Face detection plus optional nested eye detection, in detection space.
struct DetectStage {
    detectors: Detectors,
    face_params: DetectParams,
    eye_params: DetectParams,
    iou_threshold: f64,
}

impl DetectStage {
    fn run(&mut self, frame: &mut TrackedFrame) -> Result<(), TrackingError> {
        let raw = self
            .detectors
            .face
            .detect(frame.small.view(), &self.face_params)
            .map_err(|e| TrackingError::Detection(e.to_string()))?;
        frame.face_candidates = Rect::deduplicate(&raw, self.iou_threshold);

        frame.eye_candidates = match self.detectors.eye.as_mut() {
            Some(eye) => frame
                .face_candidates
                .iter()
                .map(|face| detect_eyes(&mut **eye, frame.small.view(), *face, &self.eye_params))
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        Ok(())
    }
}

/// Searches the upper half of `face` (below its top quarter) for eyes.
///
/// Returns at most two boxes, ordered left to right, in the coordinates of
/// `small`.
fn detect_eyes(
    detector: &mut dyn ObjectDetector,
    small: ArrayView2<'_, u8>,
    face: Rect<DetectionSpace>,
    params: &DetectParams,
) -> Result<Vec<Rect<DetectionSpace>>, TrackingError> {
    let (rows, cols) = small.dim();
    let half = face.height / 2;
    let search = Rect::<DetectionSpace>::new(face.x, face.y + half / 2, face.width, half - 1);
    let Some(search) = search.clamp_to(cols as u32, rows as u32) else {
        return Ok(Vec::new());
    };

    let roi = small.slice(s![
        search.y as usize..search.bottom() as usize,
        search.x as usize..search.right() as usize
    ]);
    let mut eyes = detector
        .detect(roi, params)
        .map_err(|e| TrackingError::Detection(e.to_string()))?;
    eyes.sort_by_key(|r| r.x);
    eyes.truncate(MAX_EYES);
    Ok(eyes
        .into_iter()
        .map(|r| r.translate(search.x, search.y))
        .collect())
}

/// Controls a running pipeline and exposes its output queue.
///
/// Dropping the handle cancels the run without waiting for it.
pub struct PipelineHandle {
    threads: StageThreads,
    run: Arc<RunState>,
    consumer: HandoffConsumer,
}

impl PipelineHandle {
    pub fn consumer(&self) -> HandoffConsumer {
        self.consumer.clone()
    }

    /// Stops admission; in-flight frames drain without being handed off.
    pub fn shutdown(&self) {
        log::info!("pipeline shutdown requested");
        self.run.cancel();
    }

    pub fn state(&self) -> PipelineState {
        if self.threads.iter().all(|(_, t)| t.is_finished()) {
            PipelineState::Stopped
        } else if self.run.is_cancelled() {
            PipelineState::Draining
        } else {
            PipelineState::Running
        }
    }

    /// Waits for every stage to exit.
    ///
    /// Returns the first fatal error any stage recorded, otherwise the
    /// frame accounting of the run. A live source only stops after
    /// [`shutdown`](Self::shutdown).
    pub fn join(mut self) -> Result<PipelineReport, TrackingError> {
        let mut panicked = None;
        for (stage, thread) in std::mem::take(&mut self.threads) {
            if thread.join().is_err() {
                log::error!("{stage} stage panicked");
                panicked.get_or_insert(stage);
            }
        }

        self.run.with_logger(|logger| logger.summary());

        if let Some(error) = self.run.first_error.lock().ok().and_then(|mut e| e.take()) {
            return Err(error);
        }
        if let Some(stage) = panicked {
            return Err(TrackingError::StagePanicked(stage));
        }
        Ok(self.run.report())
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.run.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StatsPipelineLogger};
    use crate::shared::frame::Frame;
    use crate::shared::geometry::FrameSpace;
    use crate::tracking::temporal_smoother::AveragingMode;
    use std::time::Duration;

    const W: u32 = 160;
    const H: u32 = 120;

    struct CountingSource {
        remaining: usize,
        next: usize,
        pulled: Arc<AtomicUsize>,
    }

    impl CountingSource {
        fn new(frames: usize) -> (Self, Arc<AtomicUsize>) {
            let pulled = Arc::new(AtomicUsize::new(0));
            let source = Self {
                remaining: frames,
                next: 0,
                pulled: Arc::clone(&pulled),
            };
            (source, pulled)
        }
    }

    impl FrameSource for CountingSource {
        fn pull(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            self.pulled.fetch_add(1, Ordering::SeqCst);
            let frame = Frame::filled(W, H, [128, 128, 128], self.next);
            self.next += 1;
            Ok(Some(frame))
        }
    }

    /// Yields `frames` frames, then holds end-of-stream until `release` closes.
    struct GatedSource {
        remaining: usize,
        next: usize,
        release: Receiver<()>,
    }

    impl GatedSource {
        fn new(frames: usize) -> (Self, Sender<()>) {
            let (release_tx, release) = crossbeam_channel::bounded(0);
            let source = Self {
                remaining: frames,
                next: 0,
                release,
            };
            (source, release_tx)
        }
    }

    impl FrameSource for GatedSource {
        fn pull(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.remaining == 0 {
                let _ = self.release.recv();
                return Ok(None);
            }
            self.remaining -= 1;
            let frame = Frame::filled(W, H, [128, 128, 128], self.next);
            self.next += 1;
            Ok(Some(frame))
        }
    }

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn pull(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            Err("device unplugged".into())
        }
    }

    struct FixedDetector(Vec<Rect<DetectionSpace>>);

    impl ObjectDetector for FixedDetector {
        fn detect(
            &mut self,
            _image: ArrayView2<'_, u8>,
            _params: &DetectParams,
        ) -> Result<Vec<Rect<DetectionSpace>>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl ObjectDetector for FailingDetector {
        fn detect(
            &mut self,
            _image: ArrayView2<'_, u8>,
            _params: &DetectParams,
        ) -> Result<Vec<Rect<DetectionSpace>>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }
    }

    fn face_only(rects: Vec<Rect<DetectionSpace>>) -> Detectors {
        Detectors {
            face: Box::new(FixedDetector(rects)),
            eye: None,
        }
    }

    fn null_logger() -> Arc<Mutex<dyn PipelineLogger>> {
        Arc::new(Mutex::new(NullPipelineLogger))
    }

    /// Pops until the pipeline has stopped and the queue is drained.
    fn drain(handle: &PipelineHandle) -> Vec<TrackedFrame> {
        let consumer = handle.consumer();
        let mut frames = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            if let Some(frame) = consumer.try_pop() {
                frames.push(frame);
            } else if handle.state() == PipelineState::Stopped && consumer.is_empty() {
                break;
            } else {
                assert!(Instant::now() < deadline, "pipeline did not stop");
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        frames
    }

    /// Pops until `count` frames have arrived.
    fn collect(handle: &PipelineHandle, count: usize) -> Vec<TrackedFrame> {
        let consumer = handle.consumer();
        let mut frames = Vec::with_capacity(count);
        let deadline = Instant::now() + Duration::from_secs(30);
        while frames.len() < count {
            match consumer.try_pop() {
                Some(frame) => frames.push(frame),
                None => {
                    assert!(Instant::now() < deadline, "only {} frames arrived", frames.len());
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }
        frames
    }

    fn wait_until(what: &str, mut ready: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while !ready() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_fixed_detection_converges_and_keeps_order() {
        let target = Rect::<FrameSpace>::new(20, 20, 80, 80);
        let (source, release) = GatedSource::new(30);
        let handle = FramePipeline::spawn(
            &TrackerConfig::default(),
            Box::new(source),
            face_only(vec![Rect::new(20, 20, 80, 80)]),
            null_logger(),
        )
        .unwrap();

        let frames = collect(&handle, 30);
        drop(release);
        let report = handle.join().unwrap();

        assert_eq!(report.frames_admitted, 30);
        assert_eq!(report.frames_handed_off, 30);
        assert_eq!(report.frames_dropped, 0);

        for pair in frames.windows(2) {
            assert!(pair[0].index() < pair[1].index());
        }
        for frame in &frames {
            assert_eq!(frame.faces.len(), 1);
            assert_eq!(frame.faces[0].detected, target);
            if frame.index() >= 4 {
                assert_eq!(frame.faces[0].smoothed, target);
            }
        }
    }

    #[test]
    fn test_detection_scale_maps_back_to_frame_space() {
        let mut config = TrackerConfig::default();
        config.detection_scale = 2.0;
        config.smoothing.averaging = AveragingMode::ValidSamples;
        let (source, release) = GatedSource::new(3);
        let handle = FramePipeline::spawn(
            &config,
            Box::new(source),
            face_only(vec![Rect::new(10, 10, 40, 40)]),
            null_logger(),
        )
        .unwrap();

        let frames = collect(&handle, 3);
        drop(release);
        handle.join().unwrap();
        assert_eq!(frames[0].small.dim(), (60, 80));
        assert_eq!(frames[0].faces[0].smoothed, Rect::new(20, 20, 80, 80));
    }

    #[test]
    fn test_no_consumer_bounds_queue_and_admission() {
        let (source, pulled) = CountingSource::new(usize::MAX);
        let config = TrackerConfig::default();
        let handle = FramePipeline::spawn(
            &config,
            Box::new(source),
            face_only(Vec::new()),
            null_logger(),
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(300));
        let consumer = handle.consumer();
        assert!(consumer.len() <= config.handoff_capacity);
        assert!(pulled.load(Ordering::SeqCst) <= config.handoff_capacity + config.pipeline_width);
        assert_eq!(handle.state(), PipelineState::Running);

        handle.shutdown();
        let report = handle.join().unwrap();
        assert_eq!(
            report.frames_handed_off + report.frames_dropped,
            report.frames_admitted
        );
    }

    #[test]
    fn test_nothing_is_handed_off_after_end_of_stream() {
        let mut config = TrackerConfig::default();
        config.handoff_capacity = 2;
        let (source, release) = GatedSource::new(3);
        let handle = FramePipeline::spawn(
            &config,
            Box::new(source),
            face_only(Vec::new()),
            null_logger(),
        )
        .unwrap();

        // Frames 0 and 1 fill the queue; frame 2 waits at handoff.
        let consumer = handle.consumer();
        wait_until("a full queue", || consumer.len() == 2);
        std::thread::sleep(Duration::from_millis(100));

        drop(release);
        wait_until("end of stream", || handle.state() != PipelineState::Running);
        assert_eq!(consumer.try_pop().unwrap().index(), 0);
        wait_until("all stages to stop", || handle.state() == PipelineState::Stopped);

        let later: Vec<usize> = std::iter::from_fn(|| consumer.try_pop())
            .map(|frame| frame.index())
            .collect();
        assert_eq!(later, vec![1]);

        let report = handle.join().unwrap();
        assert_eq!(report.frames_admitted, 3);
        assert_eq!(report.frames_handed_off, 2);
        assert_eq!(report.frames_dropped, 1);
    }

    #[test]
    fn test_empty_source_stops_cleanly() {
        let (source, _) = CountingSource::new(0);
        let handle =
            FramePipeline::spawn(&TrackerConfig::default(), Box::new(source), face_only(Vec::new()), null_logger())
                .unwrap();
        let frames = drain(&handle);
        assert!(frames.is_empty());
        assert_eq!(handle.join().unwrap(), PipelineReport::default());
    }

    #[test]
    fn test_detector_failure_stops_run() {
        let (source, _) = CountingSource::new(usize::MAX);
        let handle = FramePipeline::spawn(
            &TrackerConfig::default(),
            Box::new(source),
            Detectors {
                face: Box::new(FailingDetector),
                eye: None,
            },
            null_logger(),
        )
        .unwrap();

        let frames = drain(&handle);
        assert!(frames.is_empty());
        assert!(matches!(handle.join(), Err(TrackingError::Detection(_))));
    }

    #[test]
    fn test_source_failure_is_acquisition_error() {
        let handle = FramePipeline::spawn(
            &TrackerConfig::default(),
            Box::new(BrokenSource),
            face_only(Vec::new()),
            null_logger(),
        )
        .unwrap();
        drain(&handle);
        assert!(matches!(handle.join(), Err(TrackingError::Acquisition(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_spawning() {
        let mut config = TrackerConfig::default();
        config.pipeline_width = 0;
        let (source, pulled) = CountingSource::new(5);
        let result = FramePipeline::spawn(&config, Box::new(source), face_only(Vec::new()), null_logger());
        assert!(matches!(result, Err(TrackingError::InvalidConfig(_))));
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nested_eyes_are_translated_into_frame_coordinates() {
        let (source, release) = GatedSource::new(2);
        let mut config = TrackerConfig::default();
        config.smoothing.averaging = AveragingMode::ValidSamples;
        let handle = FramePipeline::spawn(
            &config,
            Box::new(source),
            Detectors {
                face: Box::new(FixedDetector(vec![Rect::new(20, 10, 100, 100)])),
                eye: Some(Box::new(FixedDetector(vec![
                    Rect::new(60, 5, 20, 20),
                    Rect::new(10, 5, 20, 20),
                ]))),
            },
            null_logger(),
        )
        .unwrap();

        let frames = collect(&handle, 2);
        drop(release);
        handle.join().unwrap();
        // Search region starts at (20, 10 + 50 / 2).
        let eyes = &frames[0].faces[0].eyes;
        assert_eq!(eyes[0].region, Rect::new(30, 40, 20, 20));
        assert_eq!(eyes[1].region, Rect::new(80, 40, 20, 20));
    }

    #[test]
    fn test_stage_timings_reach_the_logger() {
        let logger = Arc::new(Mutex::new(StatsPipelineLogger::new(10)));
        let shared: Arc<Mutex<dyn PipelineLogger>> = logger.clone();
        let (source, _) = CountingSource::new(4);
        let handle = FramePipeline::spawn(
            &TrackerConfig::default(),
            Box::new(source),
            face_only(Vec::new()),
            shared,
        )
        .unwrap();
        drain(&handle);
        handle.join().unwrap();

        let logger = logger.lock().unwrap();
        for stage in ["acquire", "grayscale", "downscale", "equalize", "detect", "annotate"] {
            assert!(logger.timing_stats(stage).is_some(), "no timing for {stage}");
        }
        assert!(logger.frames_done() >= 1);
    }
}
