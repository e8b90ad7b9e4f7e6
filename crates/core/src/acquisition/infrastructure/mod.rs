#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_source;
pub mod image_sequence_source;
