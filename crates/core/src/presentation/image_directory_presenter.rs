use std::path::{Path, PathBuf};

use crate::pipeline::tracked_frame::TrackedFrame;
use crate::shared::frame::RGB_CHANNELS;

use super::presenter::Presenter;

/// Saves every annotated frame as `frame_NNNNNN.png` in a directory.
pub struct ImageDirectoryPresenter {
    dir: PathBuf,
    written: usize,
}

impl ImageDirectoryPresenter {
    /// Creates `dir` (and parents) if needed.
    pub fn new(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl Presenter for ImageDirectoryPresenter {
    fn present(&mut self, frame: &TrackedFrame) -> Result<(), Box<dyn std::error::Error>> {
        let image = &frame.image;
        if image.channels() != RGB_CHANNELS {
            return Err(format!("frame {} is not RGB", frame.index()).into());
        }
        let img = image::RgbImage::from_raw(image.width(), image.height(), image.data().to_vec())
            .ok_or("frame buffer does not match its dimensions")?;
        img.save(self.path_for(frame.index()))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("wrote {} frames to {}", self.written, self.dir.display());
        Ok(())
    }
}
