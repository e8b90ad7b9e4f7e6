use std::path::Path;

use crate::acquisition::domain::frame_source::FrameSource;
use crate::shared::error::TrackingError;
use crate::shared::frame::{Frame, RGB_CHANNELS};

/// Capture settings requested from a camera device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraSettings {
    pub index: u32,
    /// Device name or path; replaces `index` when set. DirectShow opens
    /// cameras by name only, so Windows requires it.
    pub device: Option<String>,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
}

/// Decodes frames from a video file or a camera device via ffmpeg-next.
///
/// Every decoded frame is converted to RGB24 at the stream's native size.
pub struct FfmpegSource {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegSource is owned by the acquisition thread alone.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegSource {}

impl FfmpegSource {
    /// Opens a video file.
    pub fn open_file(path: &Path) -> Result<Self, TrackingError> {
        ffmpeg_next::init().map_err(acquisition_error)?;
        let ictx = ffmpeg_next::format::input(path).map_err(|e| {
            TrackingError::Acquisition(format!("cannot open {}: {e}", path.display()))
        })?;
        log::info!("reading video {}", path.display());
        Self::from_input(ictx)
    }

    /// Opens the camera chosen by `settings` through the platform capture
    /// device, asking for the configured frame rate and size.
    pub fn open_camera(settings: CameraSettings) -> Result<Self, TrackingError> {
        ffmpeg_next::init().map_err(acquisition_error)?;
        ffmpeg_next::device::register_all();

        let (format_names, url) = camera_url(settings.index, settings.device.as_deref())?;
        let format = ffmpeg_next::device::input::video()
            .find(|f| format_names.contains(&f.name()))
            .ok_or_else(|| {
                TrackingError::Acquisition(format!(
                    "no capture device format available (tried {})",
                    format_names.join(", ")
                ))
            })?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set("framerate", &settings.frame_rate.to_string());
        options.set(
            "video_size",
            &format!("{}x{}", settings.width, settings.height),
        );

        let ctx = ffmpeg_next::format::open_with(
            &url,
            &ffmpeg_next::format::Format::Input(format),
            options,
        )
        .map_err(|e| TrackingError::Acquisition(format!("cannot open camera {url}: {e}")))?;

        let ffmpeg_next::format::context::Context::Input(ictx) = ctx else {
            return Err(TrackingError::Acquisition(format!(
                "camera {url} did not open as an input"
            )));
        };
        log::info!(
            "capturing from camera {url} at {}x{} @ {} fps",
            settings.width,
            settings.height,
            settings.frame_rate
        );
        Self::from_input(ictx)
    }

    fn from_input(ictx: ffmpeg_next::format::context::Input) -> Result<Self, TrackingError> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| TrackingError::Acquisition("no video stream found".into()))?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(acquisition_error)?;
        let decoder = codec_ctx.decoder().video().map_err(acquisition_error)?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(acquisition_error)?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            width,
            height,
            stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, RGB_CHANNELS, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

impl FrameSource for FfmpegSource {
    fn pull(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(frame) = self.try_receive()? {
                    return Ok(Some(frame));
                }
                self.done = true;
                return Ok(None);
            };

            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }
}

fn acquisition_error(e: ffmpeg_next::Error) -> TrackingError {
    TrackingError::Acquisition(e.to_string())
}

type CaptureUrl = (&'static [&'static str], String);

/// Capture format names and device URL for a camera on this platform.
///
/// `device` wins over `index` when given.
fn camera_url(index: u32, device: Option<&str>) -> Result<CaptureUrl, TrackingError> {
    #[cfg(target_os = "linux")]
    {
        let url = device.map_or_else(|| format!("/dev/video{index}"), str::to_owned);
        Ok((&["video4linux2,v4l2", "v4l2"], url))
    }
    #[cfg(target_os = "macos")]
    {
        let name = device.map_or_else(|| index.to_string(), str::to_owned);
        Ok((&["avfoundation"], format!("{name}:none")))
    }
    #[cfg(target_os = "windows")]
    {
        let _ = index;
        let name = device.ok_or_else(|| {
            TrackingError::Acquisition(
                "DirectShow needs a camera name; set camera_device (see `ffmpeg -list_devices true -f dshow -i dummy`)"
                    .into(),
            )
        })?;
        Ok((&["dshow"], format!("video={name}")))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Ok((&[], device.map_or_else(|| index.to_string(), str::to_owned)))
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row padding (stride > width * 3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * RGB_CHANNELS as usize;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
