use crate::shared::frame::Frame;

/// Pull-based source of color frames (camera, video file, image sequence).
///
/// `Ok(None)` signals end of stream and is permanent: once returned, every
/// later call returns it again. Errors are terminal for the run.
pub trait FrameSource: Send {
    fn pull(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}
