use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::acquisition::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::error::TrackingError;
use crate::shared::frame::{Frame, RGB_CHANNELS};

/// Replays a directory of still images as a frame stream.
///
/// Files are read in lexicographic order, decoded with the `image` crate
/// and optionally resized and paced to a target frame rate, so recorded
/// sessions can stand in for a live camera.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    frame_size: Option<(u32, u32)>,
    frame_interval: Option<Duration>,
    last_emit: Option<Instant>,
}

impl ImageSequenceSource {
    /// Lists every image file directly inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, TrackingError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            TrackingError::Acquisition(format!("cannot read {}: {e}", dir.display()))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(TrackingError::Acquisition(format!(
                "no image files found in {}",
                dir.display()
            )));
        }
        log::info!("image sequence: {} frames from {}", paths.len(), dir.display());
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next: 0,
            frame_size: None,
            frame_interval: None,
            last_emit: None,
        }
    }

    /// Paces delivery to `fps` frames per second; 0 disables pacing.
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64));
        self
    }

    /// Resizes every decoded image to `width` × `height`.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_emit) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_emit = Some(Instant::now());
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn pull(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };

        let img = image::open(path)
            .map_err(|e| format!("failed to decode {}: {e}", path.display()))?
            .to_rgb8();
        let img = match self.frame_size {
            Some((w, h)) if (w, h) != img.dimensions() => {
                image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
            }
            _ => img,
        };

        let index = self.next;
        self.next += 1;
        self.pace();

        let (width, height) = img.dimensions();
        Ok(Some(Frame::new(img.into_raw(), width, height, RGB_CHANNELS, index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(width, height, image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_open_lists_images_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", 4, 4, [0, 0, 0]);
        write_image(dir.path(), "a.png", 4, 4, [255, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.pull().unwrap().unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(&first.data()[..3], &[255, 0, 0]);
        assert_eq!(source.pull().unwrap().unwrap().index(), 1);
    }

    #[test]
    fn test_end_of_stream_is_permanent() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "only.png", 2, 2, [9, 9, 9]);

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.pull().unwrap().is_some());
        assert!(source.pull().unwrap().is_none());
        assert!(source.pull().unwrap().is_none());
    }

    #[test]
    fn test_frame_size_resizes_images() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "big.png", 64, 48, [10, 20, 30]);

        let mut source = ImageSequenceSource::open(dir.path())
            .unwrap()
            .with_frame_size(32, 24);
        let frame = source.pull().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 24));
        assert_eq!(frame.channels(), RGB_CHANNELS);
        assert_eq!(frame.data().len(), 32 * 24 * 3);
    }

    #[test]
    fn test_frame_rate_paces_delivery() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            write_image(dir.path(), &format!("{i}.png"), 2, 2, [0, 0, 0]);
        }
        let mut source = ImageSequenceSource::open(dir.path())
            .unwrap()
            .with_frame_rate(20);

        let start = Instant::now();
        while source.pull().unwrap().is_some() {}
        // Two intervals of 50 ms between three frames.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_empty_directory_is_an_acquisition_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageSequenceSource::open(dir.path()).err().unwrap();
        assert!(matches!(err, TrackingError::Acquisition(_)));
    }

    #[test]
    fn test_corrupt_image_fails_pull() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.pull().is_err());
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        assert!(is_image_file(Path::new("frame.PNG")));
        assert!(is_image_file(Path::new("frame.jpeg")));
        assert!(!is_image_file(Path::new("frame.txt")));
        assert!(!is_image_file(Path::new("frame")));
    }
}
